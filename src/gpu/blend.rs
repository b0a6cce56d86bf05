use egui::Rgba;
use serde::{Deserialize, Serialize};

/// Blend factors, named after their GL counterparts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantAlpha,
    OneMinusConstantAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendEquation {
    /// `src * sf + dst * df`
    Add,
    /// `src * sf - dst * df`
    Subtract,
    /// `dst * df - src * sf`
    ReverseSubtract,
}

/// Fixed-function blend state applied to premultiplied colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendState {
    pub equation: BlendEquation,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    /// Alpha of the blend color constant
    pub constant_alpha: f32,
}

impl BlendState {
    /// Premultiplied source-over
    pub const SRC_OVER: BlendState = BlendState {
        equation: BlendEquation::Add,
        src: BlendFactor::One,
        dst: BlendFactor::OneMinusSrcAlpha,
        constant_alpha: 1.0,
    };

    /// Subtracts coverage from the destination instead of painting color.
    pub const fn erase(constant_alpha: f32) -> BlendState {
        BlendState {
            equation: BlendEquation::ReverseSubtract,
            src: BlendFactor::ConstantAlpha,
            dst: BlendFactor::OneMinusSrcAlpha,
            constant_alpha,
        }
    }

    fn factor(&self, factor: BlendFactor, src_alpha: f32, dst_alpha: f32) -> f32 {
        match factor {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::SrcAlpha => src_alpha,
            BlendFactor::OneMinusSrcAlpha => 1.0 - src_alpha,
            BlendFactor::DstAlpha => dst_alpha,
            BlendFactor::OneMinusDstAlpha => 1.0 - dst_alpha,
            BlendFactor::ConstantAlpha => self.constant_alpha,
            BlendFactor::OneMinusConstantAlpha => 1.0 - self.constant_alpha,
        }
    }

    pub fn apply(&self, src: Rgba, dst: Rgba) -> Rgba {
        let s = src.to_array();
        let d = dst.to_array();
        let sf = self.factor(self.src, s[3], d[3]);
        let df = self.factor(self.dst, s[3], d[3]);
        let mut out = [0.0; 4];
        for i in 0..4 {
            let value = match self.equation {
                BlendEquation::Add => s[i] * sf + d[i] * df,
                BlendEquation::Subtract => s[i] * sf - d[i] * df,
                BlendEquation::ReverseSubtract => d[i] * df - s[i] * sf,
            };
            out[i] = value.clamp(0.0, 1.0);
        }
        Rgba::from_rgba_premultiplied(out[0], out[1], out[2], out[3])
    }
}
