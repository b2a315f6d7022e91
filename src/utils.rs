/// RGBA format for colours
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colour {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Default for Colour {
    fn default() -> Self {
        // The default is the fully transparent colour
        DefinedColours::Transparent.colour()
    }
}

impl Colour {
    /// Note: Consider using the ::into() function instead.
    pub fn to_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Scales the colour channels by a light intensity, keeping the alpha as is.
    pub fn shade(&self, intensity: f32) -> Colour {
        let k = intensity.clamp(0.0, 1.0);
        Self {
            r: (self.r as f32 * k) as u8,
            g: (self.g as f32 * k) as u8,
            b: (self.b as f32 * k) as u8,
            a: self.a,
        }
    }
}

impl From<Colour> for [u8; 4] {
    fn from(value: Colour) -> Self {
        value.to_array()
    }
}

impl From<(u8, u8, u8)> for Colour {
    fn from(value: (u8, u8, u8)) -> Self {
        Self {
            r: value.0,
            g: value.1,
            b: value.2,
            a: 255,
        }
    }
}

impl From<(u8, u8, u8, u8)> for Colour {
    fn from(value: (u8, u8, u8, u8)) -> Self {
        Self {
            r: value.0,
            g: value.1,
            b: value.2,
            a: value.3,
        }
    }
}

impl From<(f32, f32, f32)> for Colour {
    fn from(value: (f32, f32, f32)) -> Self {
        let ir = (255.999 * value.0) as u8;
        let ig = (255.999 * value.1) as u8;
        let ib = (255.999 * value.2) as u8;
        Self {
            r: ir,
            g: ig,
            b: ib,
            a: 255,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum DefinedColours {
    /// Backdrop used when the film is not transparent
    Grey,
    Transparent,
}

impl DefinedColours {
    /// Fetches the [`Colour`] struct value of that DefinedColour
    pub fn colour(&self) -> Colour {
        match self {
            DefinedColours::Grey => Colour::from((50u8, 50, 50)),
            DefinedColours::Transparent => Colour::from((0u8, 0, 0, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shading_keeps_alpha() {
        let c = DefinedColours::Grey.colour().shade(0.5);
        assert_eq!(c.to_array(), [25, 25, 25, 255]);
        assert_eq!(DefinedColours::Transparent.colour().shade(1.0).to_array()[3], 0);
    }

    #[test]
    fn float_channels_map_to_full_range() {
        let c = Colour::from((1.0f32, 0.0, 0.5));
        assert_eq!(c.to_array(), [255, 0, 127, 255]);
    }
}
