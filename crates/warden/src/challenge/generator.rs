//! Icon set selection and image rendering.
//!
//! A challenge shows [`ICON_SLOTS`] icons drawn from a small catalog,
//! with repeat counts arranged so exactly one icon appears strictly
//! less often than every other. Icons are rendered as SVG placeholders
//! padded to a fixed byte length, so the correct position is never
//! distinguishable by content length.

use rand::prelude::SliceRandom;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use warden_common::Theme;
use warden_common::constants::{DISTINCT_ICONS, ICON_IMAGE_BYTES, ICON_SLOTS};

/// Icon identifiers available to the generator. Presentation varies by
/// theme; identity does not.
const CATALOG: &[&str] = &[
    "anchor", "bell", "bolt", "clover", "crown", "feather", "flame", "gear", "key", "leaf",
    "shell", "star",
];

/// Output of one generation pass, before it is bound to a session.
#[derive(Debug, Clone)]
pub struct GeneratedIcons {
    /// Icon identifier per display slot
    pub icons: Vec<String>,
    /// Position of the icon shown least often
    pub correct_position: u8,
    /// Per-position render jitter seeds
    pub noise_seeds: Vec<u64>,
}

/// Icon challenge generator.
///
/// Stateless: every call draws a fresh icon set and a fresh uniform
/// permutation, independent of any previous challenge.
#[derive(Debug, Clone, Default)]
pub struct IconGenerator;

impl IconGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Pick the icon set for one challenge.
    ///
    /// [`DISTINCT_ICONS`] distinct identifiers fill [`ICON_SLOTS`]
    /// slots with repeat counts `[1, 2, 2]`; the singleton's position
    /// after shuffling is the correct answer. Theme plays no part here.
    pub fn generate(&self) -> GeneratedIcons {
        let mut rng = rng();

        let mut picks: Vec<&str> = CATALOG.to_vec();
        picks.shuffle(&mut rng);
        let distinct = &picks[..DISTINCT_ICONS];

        // Singleton first, then the repeated icons fill the rest.
        let mut icons: Vec<String> = Vec::with_capacity(ICON_SLOTS);
        icons.push(distinct[0].to_string());
        let mut filler = 1;
        while icons.len() < ICON_SLOTS {
            icons.push(distinct[filler].to_string());
            if icons.len() < ICON_SLOTS {
                icons.push(distinct[filler].to_string());
            }
            filler += 1;
        }

        icons.shuffle(&mut rng);

        let correct_position = icons
            .iter()
            .position(|icon| icon == distinct[0])
            .map(|p| p as u8)
            .unwrap_or_default();

        let noise_seeds = (0..ICON_SLOTS).map(|_| rng.random::<u64>()).collect();

        GeneratedIcons {
            icons,
            correct_position,
            noise_seeds,
        }
    }

    /// Render one icon as SVG bytes, padded to [`ICON_IMAGE_BYTES`].
    ///
    /// Deterministic per (icon, theme, seed): repeated positions of the
    /// same icon render alike to the eye, while the seed jitters each
    /// copy enough that their bytes differ.
    pub fn render_icon(&self, icon: &str, theme: Theme, seed: u64) -> Vec<u8> {
        let digest = Sha256::digest(icon.as_bytes());

        let fill = format!("#{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2]);
        let accent = format!("#{:02x}{:02x}{:02x}", digest[3], digest[4], digest[5]);
        let background = match theme {
            Theme::Light => "#f5f5f5",
            Theme::Dark => "#1a1a2e",
        };

        // Seed-derived jitter, at most 3px in either direction
        let dx = (seed % 7) as i64 - 3;
        let dy = ((seed >> 3) % 7) as i64 - 3;

        let shape = match digest[6] % 4 {
            0 => format!(r#"<circle cx="32" cy="32" r="18" fill="{fill}" stroke="{accent}" stroke-width="3"/>"#),
            1 => format!(r#"<rect x="14" y="14" width="36" height="36" rx="6" fill="{fill}" stroke="{accent}" stroke-width="3"/>"#),
            2 => format!(r#"<polygon points="32,12 52,50 12,50" fill="{fill}" stroke="{accent}" stroke-width="3"/>"#),
            _ => format!(r#"<polygon points="32,10 54,32 32,54 10,32" fill="{fill}" stroke="{accent}" stroke-width="3"/>"#),
        };

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64"><rect width="100%" height="100%" fill="{background}"/><g transform="translate({dx} {dy})">{shape}</g></svg>"#
        );

        // Pad with a comment to the fixed size class
        if svg.len() + 7 <= ICON_IMAGE_BYTES {
            let pad = ICON_IMAGE_BYTES - svg.len() - 7;
            svg.push_str("<!--");
            svg.push_str(&"*".repeat(pad));
            svg.push_str("-->");
        }
        debug_assert_eq!(svg.len(), ICON_IMAGE_BYTES);

        svg.into_bytes()
    }

    /// Content hash of a rendered image, as handed to the client in the
    /// challenge descriptor.
    pub fn icon_hash(&self, image: &[u8]) -> String {
        STANDARD.encode(Sha256::digest(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_exactly_one_least_frequent_icon() {
        let generator = IconGenerator::new();

        for _ in 0..50 {
            let generated = generator.generate();
            assert_eq!(generated.icons.len(), ICON_SLOTS);
            assert_eq!(generated.noise_seeds.len(), ICON_SLOTS);

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for icon in &generated.icons {
                *counts.entry(icon.as_str()).or_default() += 1;
            }

            let singleton = &generated.icons[generated.correct_position as usize];
            let singleton_count = counts[singleton.as_str()];
            for (icon, count) in &counts {
                if *icon != singleton.as_str() {
                    assert!(
                        singleton_count < *count,
                        "correct icon must be strictly least frequent"
                    );
                }
            }
            let minimums = counts.values().filter(|c| **c == singleton_count).count();
            assert_eq!(minimums, 1, "minimum repeat count must be unique");
        }
    }

    #[test]
    fn test_correct_position_varies_across_challenges() {
        let generator = IconGenerator::new();
        let positions: HashSet<u8> = (0..50).map(|_| generator.generate().correct_position).collect();
        assert!(
            positions.len() > 1,
            "placement never changed over 50 challenges"
        );
    }

    #[test]
    fn test_icons_render_to_a_uniform_size_class() {
        let generator = IconGenerator::new();
        let generated = generator.generate();

        for (position, icon) in generated.icons.iter().enumerate() {
            let image = generator.render_icon(icon, Theme::Light, generated.noise_seeds[position]);
            assert_eq!(image.len(), ICON_IMAGE_BYTES);
        }
    }

    #[test]
    fn test_rendering_is_deterministic_per_seed() {
        let generator = IconGenerator::new();

        let a = generator.render_icon("bell", Theme::Light, 0);
        let b = generator.render_icon("bell", Theme::Light, 0);
        assert_eq!(a, b);

        let jittered = generator.render_icon("bell", Theme::Light, 1);
        assert_ne!(a, jittered, "seed must perturb the rendered bytes");
    }

    #[test]
    fn test_theme_changes_rendering_only() {
        let generator = IconGenerator::new();
        let light = generator.render_icon("star", Theme::Light, 5);
        let dark = generator.render_icon("star", Theme::Dark, 5);
        assert_ne!(light, dark);
        assert_eq!(light.len(), dark.len());
    }

    #[test]
    fn test_icon_hash_is_stable() {
        let generator = IconGenerator::new();
        let image = generator.render_icon("gear", Theme::Dark, 9);
        assert_eq!(generator.icon_hash(&image), generator.icon_hash(&image));
        assert_ne!(
            generator.icon_hash(&image),
            generator.icon_hash(b"something else")
        );
    }
}
