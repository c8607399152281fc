use serde::{Deserialize, Serialize};
use std::fmt;

/// The six story styles a caller may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoryStyle {
    FairyTale,
    SciFi,
    Adventure,
    Mystery,
    Comedy,
    EverydayLife,
}

impl StoryStyle {
    pub const ALL: [StoryStyle; 6] = [
        StoryStyle::FairyTale,
        StoryStyle::SciFi,
        StoryStyle::Adventure,
        StoryStyle::Mystery,
        StoryStyle::Comedy,
        StoryStyle::EverydayLife,
    ];

    /// Parses a style tag. `"fairy tale"`, `"fairy-tale"` and `"fairy_tale"` are all
    /// the same tag; matching is case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "fairy-tale" => Some(StoryStyle::FairyTale),
            "sci-fi" | "scifi" => Some(StoryStyle::SciFi),
            "adventure" => Some(StoryStyle::Adventure),
            "mystery" => Some(StoryStyle::Mystery),
            "comedy" => Some(StoryStyle::Comedy),
            "everyday-life" => Some(StoryStyle::EverydayLife),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            StoryStyle::FairyTale => "fairy tale",
            StoryStyle::SciFi => "sci-fi",
            StoryStyle::Adventure => "adventure",
            StoryStyle::Mystery => "mystery",
            StoryStyle::Comedy => "comedy",
            StoryStyle::EverydayLife => "everyday life",
        }
    }
}

impl fmt::Display for StoryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    Long,
}

impl StoryLength {
    pub const ALL: [StoryLength; 2] = [StoryLength::Short, StoryLength::Long];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "short" => Some(StoryLength::Short),
            "long" => Some(StoryLength::Long),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            StoryLength::Short => "short",
            StoryLength::Long => "long",
        }
    }
}

impl fmt::Display for StoryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Image formats the backend is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMediaType {
    Jpeg,
    Png,
    Bmp,
    Webp,
}

impl ImageMediaType {
    /// Parses a declared MIME type such as `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageMediaType::Jpeg),
            "image/png" => Some(ImageMediaType::Png),
            "image/bmp" | "image/x-ms-bmp" => Some(ImageMediaType::Bmp),
            "image/webp" => Some(ImageMediaType::Webp),
            _ => None,
        }
    }

    /// Maps a file extension (with or without the leading dot) to a media type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageMediaType::Jpeg),
            "png" => Some(ImageMediaType::Png),
            "bmp" => Some(ImageMediaType::Bmp),
            "webp" => Some(ImageMediaType::Webp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageMediaType::Jpeg => "image/jpeg",
            ImageMediaType::Png => "image/png",
            ImageMediaType::Bmp => "image/bmp",
            ImageMediaType::Webp => "image/webp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageMediaType::Jpeg => image::ImageFormat::Jpeg,
            ImageMediaType::Png => image::ImageFormat::Png,
            ImageMediaType::Bmp => image::ImageFormat::Bmp,
            ImageMediaType::Webp => image::ImageFormat::WebP,
        }
    }
}

/// One story request as handed over by the transport layer.
///
/// Style, length and media type are kept as the raw strings the caller sent;
/// they are validated by the generator before anything else happens.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: Vec<u8>,
    pub media_type: String,
    pub child_name: String,
    pub style: String,
    pub length: String,
    pub api_key: Option<String>,
    pub prompt_template: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(
        image: Vec<u8>,
        media_type: impl Into<String>,
        child_name: impl Into<String>,
        style: impl Into<String>,
        length: impl Into<String>,
    ) -> Self {
        Self {
            image,
            media_type: media_type.into(),
            child_name: child_name.into(),
            style: style.into(),
            length: length.into(),
            api_key: None,
            prompt_template: None,
            model: None,
            temperature: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token accounting for one backend call. All zero when the backend reports none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_units: u32,
    pub output_units: u32,
    pub total_units: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub usage: Usage,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_tags_accept_every_spelling() {
        assert_eq!(StoryStyle::from_tag("fairy tale"), Some(StoryStyle::FairyTale));
        assert_eq!(StoryStyle::from_tag("Fairy-Tale"), Some(StoryStyle::FairyTale));
        assert_eq!(
            StoryStyle::from_tag("everyday_life"),
            Some(StoryStyle::EverydayLife)
        );
        assert_eq!(StoryStyle::from_tag("sci-fi"), Some(StoryStyle::SciFi));
        assert_eq!(StoryStyle::from_tag("not-a-style"), None);
        assert_eq!(StoryStyle::from_tag(""), None);

        for style in StoryStyle::ALL {
            assert_eq!(StoryStyle::from_tag(style.as_tag()), Some(style));
        }
    }

    #[test]
    fn test_length_tags() {
        assert_eq!(StoryLength::from_tag("short"), Some(StoryLength::Short));
        assert_eq!(StoryLength::from_tag(" LONG "), Some(StoryLength::Long));
        assert_eq!(StoryLength::from_tag("medium"), None);
    }

    #[test]
    fn test_media_types() {
        assert_eq!(ImageMediaType::from_mime("image/jpg"), Some(ImageMediaType::Jpeg));
        assert_eq!(ImageMediaType::from_mime("IMAGE/PNG"), Some(ImageMediaType::Png));
        assert_eq!(ImageMediaType::from_mime("image/gif"), None);
        assert_eq!(ImageMediaType::from_extension(".JPEG"), Some(ImageMediaType::Jpeg));
        assert_eq!(ImageMediaType::from_extension("webp"), Some(ImageMediaType::Webp));
        assert_eq!(ImageMediaType::from_extension(".tiff"), None);
        assert_eq!(ImageMediaType::Bmp.mime(), "image/bmp");
    }
}
