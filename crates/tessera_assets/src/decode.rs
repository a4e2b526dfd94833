//! Asset decoding
//!
//! [`DefaultAssetFactory`] turns out-of-band bytes into [`DecodedAsset`]s for
//! hosts without an engine-provided decoder: images become RGBA
//! [`ImageData`], fonts are validated into [`FontData`], audio is sniffed into
//! [`AudioData`].

use image::{DynamicImage, GenericImageView};
use tessera_core::{AssetFactory, AssetKind, DecodedAsset, EngineError, ImageHandle, NativeObject};

/// Decoded image pixels
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageData {
    /// Decode an encoded image (PNG, JPEG, GIF, WebP, BMP)
    pub fn from_bytes(data: &[u8]) -> Result<Self, EngineError> {
        let img = image::load_from_memory(data).map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(Self::from_dynamic_image(img))
    }

    fn from_dynamic_image(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            pixels: img.to_rgba8().into_raw(),
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A validated font file
#[derive(Debug, Clone)]
pub struct FontData {
    bytes: Vec<u8>,
    units_per_em: u16,
    glyph_count: u16,
}

impl FontData {
    /// Validate TrueType/OpenType bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, EngineError> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| EngineError::Decode(format!("Invalid font: {}", e)))?;
        Ok(Self {
            units_per_em: face.units_per_em(),
            glyph_count: face.number_of_glyphs(),
            bytes: data.to_vec(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }
}

/// Container format of an audio asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Ogg,
    Flac,
    Mp3,
}

impl AudioFormat {
    /// Identify the container from its leading bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(Self::Wav),
            [b'O', b'g', b'g', b'S', ..] => Some(Self::Ogg),
            [b'f', b'L', b'a', b'C', ..] => Some(Self::Flac),
            [b'I', b'D', b'3', ..] => Some(Self::Mp3),
            // MPEG audio frame sync
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(Self::Mp3),
            _ => None,
        }
    }
}

/// Encoded audio with its detected container
#[derive(Debug, Clone)]
pub struct AudioData {
    bytes: Vec<u8>,
    format: AudioFormat,
}

impl AudioData {
    pub fn from_bytes(data: &[u8]) -> Result<Self, EngineError> {
        let format = AudioFormat::sniff(data)
            .ok_or_else(|| EngineError::Decode("Unrecognized audio format".to_string()))?;
        Ok(Self {
            bytes: data.to_vec(),
            format,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Decodes images, fonts and audio without an engine runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAssetFactory;

impl DefaultAssetFactory {
    /// Decode encoded image bytes into an [`ImageHandle`]
    pub fn decode_image(bytes: &[u8]) -> Result<ImageHandle, EngineError> {
        let image = ImageData::from_bytes(bytes)?;
        Ok(ImageHandle::new(NativeObject::new(image), bytes.len()))
    }
}

impl AssetFactory for DefaultAssetFactory {
    fn decode(&self, kind: AssetKind, bytes: &[u8]) -> Result<DecodedAsset, EngineError> {
        match kind {
            AssetKind::Image => Self::decode_image(bytes).map(DecodedAsset::Image),
            AssetKind::Font => {
                FontData::from_bytes(bytes).map(|font| DecodedAsset::Font(NativeObject::new(font)))
            }
            AssetKind::Audio => AudioData::from_bytes(bytes)
                .map(|audio| DecodedAsset::Audio(NativeObject::new(audio))),
        }
    }
}
