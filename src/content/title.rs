//! Post title derivation.
//!
//! Posts are titled `[{abbrev}] {paper title}` where the abbreviation is the
//! name the paper is commonly known by: a bracket prefix already present in
//! the title, a known-model keyword match, or initials as a last resort.

/// Words skipped when building an abbreviation from title initials.
const STOP_WORDS: [&str; 18] = [
    "the", "a", "an", "and", "or", "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "as", "is", "are", "via",
];

/// `(keywords, abbreviation)` pairs for papers commonly known by a model
/// name. First match wins, so more specific entries come first.
const KNOWN_MODELS: [(&[&str], &str); 24] = [
    (&["vision transformer", "an image is worth", "image is worth 16x16"], "ViT"),
    (&["swin transformer"], "Swin"),
    (&["attention is all you need"], "Transformer"),
    (&["segment anything"], "SAM"),
    (&["masked autoencoder"], "MAE"),
    (&["momentum contrast"], "MoCo"),
    (&["simple framework for contrastive"], "SimCLR"),
    (&["bootstrap your own"], "BYOL"),
    (&["swapping assignments", "contrasting cluster assignments"], "SwAV"),
    (&["natural language supervision", "learning transferable"], "CLIP"),
    (&["bootstrapping language-image"], "BLIP"),
    (&["end-to-end object detection"], "DETR"),
    (&["yolo"], "YOLO"),
    (&["neural radiance fields", "nerf"], "NeRF"),
    (&["gaussian splatting", "3d gaussian"], "3D-GS"),
    (&["stable diffusion"], "Stable Diffusion"),
    (&["latent diffusion"], "LDM"),
    (&["denoising diffusion"], "DDPM"),
    (&["generative adversarial"], "GAN"),
    (&["low-rank adaptation"], "LoRA"),
    (&["bidirectional encoder"], "BERT"),
    (&["text-to-text transfer"], "T5"),
    (&["residual learning"], "ResNet"),
    (&["efficientnet"], "EfficientNet"),
];

/// Derive the full post title for a paper.
#[must_use]
pub fn post_title(paper_title: &str) -> String {
    // A bracket prefix in the source title already carries the abbreviation.
    if let Some(rest) = paper_title.strip_prefix('[')
        && let Some((abbrev, tail)) = rest.split_once(']')
        && !abbrev.trim().is_empty()
    {
        return format!("[{}] {}", abbrev.trim(), tail.trim());
    }
    format!("[{}] {}", abbreviation(paper_title), paper_title.trim())
}

/// Best-effort abbreviation for a paper title.
#[must_use]
pub fn abbreviation(paper_title: &str) -> String {
    let lower = paper_title.to_lowercase();
    for (keywords, abbrev) in KNOWN_MODELS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return (*abbrev).to_owned();
        }
    }

    // The first word is often itself the model name ("DINOv2: ...").
    let words: Vec<&str> = paper_title.split_whitespace().collect();
    if let Some(first) = words.first() {
        let first = first.trim_end_matches(':');
        if first.len() >= 2 && first.len() <= 6 && first.chars().all(|c| c.is_ascii_uppercase()) {
            return first.to_owned();
        }
        let caps: String = first.chars().filter(|c| c.is_ascii_uppercase()).collect();
        if (2..=4).contains(&caps.len()) {
            return caps;
        }
    }

    // Last resort: initials of the capitalized significant words.
    let initials: String = words
        .iter()
        .filter(|w| {
            w.chars().next().is_some_and(char::is_uppercase)
                && !STOP_WORDS.contains(&w.to_lowercase().as_str())
        })
        .take(4)
        .filter_map(|w| w.chars().next())
        .collect();
    if initials.len() >= 2 {
        return initials;
    }

    words.first().map_or_else(|| "Paper".to_owned(), |w| (*w).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_prefix_passes_through() {
        assert_eq!(
            post_title("[DINOv2] Learning Robust Visual Features"),
            "[DINOv2] Learning Robust Visual Features"
        );
    }

    #[test]
    fn known_models_are_recognized() {
        assert_eq!(
            abbreviation("An Image is Worth 16x16 Words: Transformers for Image Recognition"),
            "ViT"
        );
        assert_eq!(abbreviation("Attention Is All You Need"), "Transformer");
        assert_eq!(abbreviation("Segment Anything"), "SAM");
        assert_eq!(
            abbreviation("LoRA: Low-Rank Adaptation of Large Language Models"),
            "LoRA"
        );
    }

    #[test]
    fn uppercase_first_word_is_used_directly() {
        assert_eq!(abbreviation("DETR for Dense Prediction"), "DETR");
    }

    #[test]
    fn mixed_case_first_word_yields_its_capitals() {
        assert_eq!(abbreviation("DeepLab: Semantic Image Segmentation"), "DL");
    }

    #[test]
    fn initials_fallback_skips_stop_words() {
        assert_eq!(
            abbreviation("Learning Deep Features for Scene Recognition"),
            "LDFS"
        );
    }

    #[test]
    fn title_composes_abbreviation_and_original() {
        assert_eq!(
            post_title("Attention Is All You Need"),
            "[Transformer] Attention Is All You Need"
        );
    }
}
