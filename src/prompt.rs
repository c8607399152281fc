//! Story prompt construction.
//!
//! Templates use `{name}` placeholders resolved against [`PromptVariables`];
//! `{{` and `}}` produce literal braces. Anything else inside braces (positional
//! indices, attribute access, format specifiers) is rejected rather than interpreted,
//! so user supplied templates can only ever look up the four known values.

use crate::error::TemplateError;
use crate::models::{StoryLength, StoryStyle};

/// Stands in for the drawing in the prompt; the image itself travels alongside.
pub const IMAGE_DESCRIPTION: &str = "the provided drawing";

pub const DEFAULT_TEMPLATE: &str = "\
You are a warm, imaginative children's author. Look carefully at {imageDescription}, \
a picture drawn by a child named {childName}.

Write an original children's story in the Bosnian language inspired by what you see \
in the drawing. The story should be a {styleLabel}, about {lengthLabel} long, and \
{childName} should be the main hero.

Guidelines:
- Mention the characters, colours and objects from the drawing.
- Keep the language simple, gentle and suitable for young children.
- End with a kind, positive message.
- Start with a short title on its own line.";

pub const PLACEHOLDER_NAMES: [&str; 4] =
    ["childName", "styleLabel", "lengthLabel", "imageDescription"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVariables {
    pub child_name: String,
    pub style_label: String,
    pub length_label: String,
    pub image_description: String,
}

impl PromptVariables {
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "childName" => Some(&self.child_name),
            "styleLabel" => Some(&self.style_label),
            "lengthLabel" => Some(&self.length_label),
            "imageDescription" => Some(&self.image_description),
            _ => None,
        }
    }
}

pub fn style_label(style: StoryStyle) -> &'static str {
    match style {
        StoryStyle::FairyTale => "bajka",
        StoryStyle::SciFi => "naučna fantastika",
        StoryStyle::Adventure => "avantura",
        StoryStyle::Mystery => "misterija",
        StoryStyle::Comedy => "komedija",
        StoryStyle::EverydayLife => "svakodnevni život",
    }
}

pub fn length_label(length: StoryLength) -> &'static str {
    match length {
        StoryLength::Short => "5 paragrafa",
        StoryLength::Long => "10 paragrafa",
    }
}

pub fn build_variables(
    child_name: &str,
    style: StoryStyle,
    length: StoryLength,
    image_description: &str,
) -> PromptVariables {
    PromptVariables {
        child_name: child_name.trim().to_string(),
        style_label: style_label(style).to_string(),
        length_label: length_label(length).to_string(),
        image_description: image_description.to_string(),
    }
}

/// Substitutes every placeholder in `template`.
pub fn render(template: &str, variables: &PromptVariables) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len() + 64);
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    output.push('{');
                    continue;
                }

                let mut name = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }

                if !closed {
                    return Err(malformed(position, "unclosed '{'"));
                }
                if name.is_empty() {
                    return Err(malformed(position, "empty placeholder '{}'"));
                }
                if !is_identifier(&name) {
                    return Err(malformed(
                        position,
                        format!("'{{{}}}' is not a plain placeholder name", name),
                    ));
                }

                match variables.get(&name) {
                    Some(value) => output.push_str(value),
                    None => return Err(TemplateError::MissingVariable(name)),
                }
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_some() {
                    output.push('}');
                } else {
                    return Err(malformed(position, "single '}' outside a placeholder"));
                }
            }
            _ => output.push(c),
        }
    }

    Ok(output)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn malformed(position: usize, reason: impl Into<String>) -> TemplateError {
    TemplateError::MalformedTemplate {
        position,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amina() -> PromptVariables {
        build_variables(
            "Amina",
            StoryStyle::FairyTale,
            StoryLength::Short,
            IMAGE_DESCRIPTION,
        )
    }

    #[test]
    fn test_labels_are_total() {
        for style in StoryStyle::ALL {
            assert!(!style_label(style).is_empty());
        }
        for length in StoryLength::ALL {
            assert!(!length_label(length).is_empty());
        }
        assert_eq!(length_label(StoryLength::Short), "5 paragrafa");
        assert_eq!(length_label(StoryLength::Long), "10 paragrafa");
    }

    #[test]
    fn test_default_template_renders_for_every_combination() {
        for style in StoryStyle::ALL {
            for length in StoryLength::ALL {
                let vars = build_variables("Tarik", style, length, IMAGE_DESCRIPTION);
                let prompt = render(DEFAULT_TEMPLATE, &vars).unwrap();
                assert!(prompt.contains("Tarik"));
                assert!(prompt.contains(style_label(style)));
                assert!(prompt.contains(length_label(length)));
                assert!(!prompt.contains('{'));
            }
        }
    }

    #[test]
    fn test_default_template_uses_only_known_placeholders() {
        let mut rest = DEFAULT_TEMPLATE;
        while let Some(start) = rest.find('{') {
            let end = rest[start..].find('}').unwrap() + start;
            assert!(PLACEHOLDER_NAMES.contains(&&rest[start + 1..end]));
            rest = &rest[end + 1..];
        }
    }

    #[test]
    fn test_render_custom_template() {
        let prompt = render("{childName} / {styleLabel} / {lengthLabel}", &amina()).unwrap();
        assert_eq!(prompt, "Amina / bajka / 5 paragrafa");
    }

    #[test]
    fn test_escaped_braces() {
        let prompt = render("{{literal}} {childName}", &amina()).unwrap();
        assert_eq!(prompt, "{literal} Amina");
    }

    #[test]
    fn test_unknown_placeholder_is_missing_variable() {
        let err = render("Hello {childName}, a {nonexistentKey} story", &amina()).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("nonexistentKey".into()));
    }

    #[test]
    fn test_malformed_templates() {
        for template in [
            "Hello {childName",
            "Hello {}",
            "Hello }",
            "{0}",
            "{childName.__class__}",
            "{childName!r}",
            "{childName:>10}",
        ] {
            let err = render(template, &amina()).unwrap_err();
            assert!(
                matches!(err, TemplateError::MalformedTemplate { .. }),
                "{template} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let vars = build_variables(
            "{styleLabel}",
            StoryStyle::Comedy,
            StoryLength::Long,
            IMAGE_DESCRIPTION,
        );
        assert_eq!(render("{childName}", &vars).unwrap(), "{styleLabel}");
    }
}
