use reqwest::Url;
use serde::Deserialize;

#[derive(Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct AudioTrack {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Replace every character that is not a word character, whitespace, or one
/// of `-.()[]` with `_`.
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '.' | '(' | ')' | '[' | ']' | '_' => c,
            c if c.is_alphanumeric() || c.is_whitespace() => c,
            _ => '_',
        })
        .collect()
}

impl AudioTrack {
    pub fn new(artist: &str, title: &str, url: &str) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn track_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Remote url without the `?extra=` query and fragment.
    pub fn clean_url(&self) -> Option<Url> {
        let mut url: Url = self.url.parse().ok()?;
        url.set_query(None);
        url.set_fragment(None);
        Some(url)
    }

    pub fn extension(&self) -> String {
        self.clean_url()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .and_then(|basename| {
                        basename
                            .rfind('.')
                            .filter(|i| *i > 0)
                            .map(|i| basename[i..].to_string())
                    })
            })
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", sanitize_file_stem(&self.track_name()), self.extension())
    }
}
