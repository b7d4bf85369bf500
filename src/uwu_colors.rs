use owo_colors::{OwoColorize, Style, Styled};
use supports_color::Stream;

pub trait StreamStyle {
    fn outstyle(&self, style: Style) -> Styled<&Self>;
    fn errstyle(&self, style: Style) -> Styled<&Self>;
}

impl<D> StreamStyle for D {
    fn outstyle(&self, style: Style) -> Styled<&Self> {
        self.style(gate(Stream::Stdout, style))
    }

    fn errstyle(&self, style: Style) -> Styled<&Self> {
        self.style(gate(Stream::Stderr, style))
    }
}

fn gate(stream: Stream, style: Style) -> Style {
    supports_color::on(stream)
        .filter(|f| f.has_basic)
        .map_or_else(Style::new, |_| style)
}
