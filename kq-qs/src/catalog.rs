//! Fallback catalog for idle auto-fill
//!
//! A list of source links injected from configuration. When the display has
//! been idle with an empty queue, one link is picked at random and appended.

use kq_common::config::AutoFillConfig;
use rand::seq::SliceRandom;
use tracing::warn;

/// Built-in catalog: holiday karaoke favourites
const BUILTIN_MEDIA_IDS: &[&str] = &[
    "0bhsXykXxfg", "yXQViqx6GMY", "1d8LHxByxRU", "E8gmARGvPlI", "gset79KMmt0",
    "Qe1Bj7qIang", "Dkq3LD-4pmM", "PPcpd-YBlGw", "AN_R4pR1hck", "-Z6AnCRjWX0",
    "j9jbdgZidu8", "Rnil5LyK_B0", "uSjq7x67kzM", "IJPc7esgvsA", "4eY3SfWYI4I",
    "Q_yuO8UNGmY", "DkXIJe8CaIc", "7Rv3wfwIVBc", "wKhRnZZ0cJI", "nlR0MkrRklg",
    "bQ6LIS6m8qE", "z1rYmzQ8C9Q", "LUjn3RpkcKY", "94Ye-3C1FC8", "8gWHlHWIaRQ",
    "5W6Is98o510", "YfF10ow4YEo", "hLf0-lro8X8", "r7dhSn8bnLg", "fvNC-kPKWqQ",
    "hJw-ey1DPRA", "GhRJJ0PEXVc", "kORRidv-p0Y", "y1R4t5xfvO4", "3KK6sMo8NBY",
    "N-PyWfVkjZc", "4QJKhKNWy5o", "YiadNVhaGwk", "JhcLpwlA-ZA", "eH8fEgMF7WQ",
    "oIKt5p3UmXg", "LRP8d7hhpoQ", "3ZT9_H4-hbM", "Oswkllz_Lvs", "l3l83C-we-k",
    "iM-n3s6SD2U", "IbRtGMm96F8", "4pPpxsbqxR8", "-iZGh91-v7Y", "ZzUgaMbe_0Q",
    "V3EYjVPRClU", "6bbuBubZ1yE", "oZ5cmrz-mrU", "_MzumcY3lpk", "0FTMpAEHz1Q",
    "qw2TD91Nytg", "GqUp5K_sHd0", "O89sPooBhyE", "wKj92352UAE", "NJ6kJ7GWtv0",
    "EqHzjDBXSFI", "MaA7B9cu4kU", "fMAlTDQT_9k", "wYJCB6pGz-c", "rZCEBibnRM8",
    "Vs9FPx3_Slk", "mBycW6iu8GM", "nBCkXe3ZfoI", "jgAZVgfUxcg", "-wNhdjoF-6M",
    "ydhiAOt9364", "30TkClWvT5k", "ByK84WFMaJw", "M2b6O30TtBo", "lPzh8fX2leM",
    "2LbmhneqBnE", "0yhI35F2NB0", "f22j1cRUXBE", "7oTdKkytYK8", "hmRkwbFOFVQ",
    "PTslBTBl1X8", "Rpg7-ab_F7s", "GAs67cRfmQI", "0G7HpFyEBVM", "g7KkM9iDj7s",
    "ElmsIGT85tI", "DnAFX3pvZaY", "KnbqzkC3i9k", "AEyGZlBdkaA", "pFjdfjrtf1Q",
    "Q49o_VQg8C4", "P1qXL1cEgi4", "im2JjOhTW80", "9UwpVfZ_LPY", "n_OuJnQnwFE",
    "3Avycrez66o", "TShCxqvqE3s", "vmiAeIOsugQ",
];

/// Injected list of source links
#[derive(Debug, Clone, Default)]
pub struct FallbackCatalog {
    urls: Vec<String>,
}

impl FallbackCatalog {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    /// The built-in holiday list
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_MEDIA_IDS
                .iter()
                .map(|id| format!("https://www.youtube.com/watch?v={}", id))
                .collect(),
        )
    }

    /// Catalog from `[auto_fill] catalog`, or the built-in list when unset
    ///
    /// Links that yield no media id are dropped with a warning so that every
    /// pick can be appended.
    pub fn from_config(config: &AutoFillConfig) -> Self {
        let Some(urls) = &config.catalog else {
            return Self::builtin();
        };

        let urls = urls
            .iter()
            .filter(|url| {
                let usable = kq_common::extract_media_id(url).is_some();
                if !usable {
                    warn!("Ignoring unusable catalog link: {}", url);
                }
                usable
            })
            .cloned()
            .collect();

        Self::new(urls)
    }

    /// Uniformly random link, `None` when the catalog is empty
    pub fn pick(&self) -> Option<&str> {
        self.urls.choose(&mut rand::thread_rng()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
