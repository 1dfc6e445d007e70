use std::fmt::Display;

use color_eyre::owo_colors::OwoColorize;

pub struct ColourDot(pub bool);

impl<T> From<&Option<T>> for ColourDot {
    fn from(option: &Option<T>) -> Self {
        ColourDot(option.is_some())
    }
}

impl Display for ColourDot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let char = '●';

        if self.0 {
            write!(f, "{}", char.bright_green())
        } else {
            write!(f, "{}", char.bright_red())
        }
    }
}
