use super::{CodeOptions, Encoder, RenderError};
use qrcode::{QrCode, render::svg};

/// QR code encoder producing standalone SVG markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrSvgEncoder;

impl Encoder for QrSvgEncoder {
    fn encode(&self, payload: &str, options: &CodeOptions) -> Result<String, RenderError> {
        let code =
            QrCode::new(payload.as_bytes()).map_err(|e| RenderError::Encode(e.to_string()))?;

        Ok(code
            .render::<svg::Color<'_>>()
            .min_dimensions(options.size, options.size)
            .quiet_zone(options.quiet_zone)
            .dark_color(svg::Color(&options.dark))
            .light_color(svg::Color(&options.light))
            .build())
    }
}
