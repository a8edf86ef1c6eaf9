// Copyright 2026 Vocab Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `scheme://word/<id>` links opened from the widget and from outside.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::model::InjectSource;

pub const DEFAULT_SCHEME: &str = "vocab";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub word_id: String,
    pub source: InjectSource,
}

/// Parses `scheme://word/<id>` and the widget's `scheme:///word/<id>`, with an
/// optional `?source=` query. Anything else is `None`.
pub fn parse_deep_link(scheme: &str, url: &str) -> Option<DeepLink> {
    let url = Url::parse(url.trim()).ok()?;
    if !url.scheme().eq_ignore_ascii_case(scheme) {
        return None;
    }

    let mut segments: Vec<&str> = url.path_segments()?.collect();
    if segments.last().is_some_and(|last| last.is_empty()) {
        segments.pop();
    }
    // `scheme://word/<id>` puts `word` in the host slot. The widget form has
    // an empty host and carries `word` in the path.
    let id_segment = match url.host_str().filter(|host| !host.is_empty()) {
        Some(host) if host.eq_ignore_ascii_case("word") => match segments.as_slice() {
            [id] => *id,
            _ => return None,
        },
        Some(_) => return None,
        None => match segments.as_slice() {
            [word, id] if word.eq_ignore_ascii_case("word") => *id,
            _ => return None,
        },
    };

    let word_id = percent_decode_str(id_segment).decode_utf8().ok()?.trim().to_string();
    if word_id.is_empty() || word_id.contains('/') {
        return None;
    }

    let source = url
        .query_pairs()
        .find(|(key, _)| key == "source")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(InjectSource::Deeplink);

    Some(DeepLink { word_id, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, source: InjectSource) -> Option<DeepLink> {
        Some(DeepLink {
            word_id: id.to_string(),
            source,
        })
    }

    #[test]
    fn accepts_app_and_widget_forms() {
        assert_eq!(
            parse_deep_link("vocab", "vocab://word/en_1"),
            link("en_1", InjectSource::Deeplink)
        );
        assert_eq!(
            parse_deep_link("vocab", "vocab:///word/ja_2?source=widget"),
            link("ja_2", InjectSource::Widget)
        );
        assert_eq!(
            parse_deep_link("vocab", "vocab://word/zh_1/?x=1&source=lockscreen"),
            link("zh_1", InjectSource::Lockscreen)
        );
    }

    #[test]
    fn fragment_and_scheme_case_do_not_change_the_link() {
        assert_eq!(
            parse_deep_link("vocab", "vocab://word/en_1?source=widget#card"),
            link("en_1", InjectSource::Widget)
        );
        assert_eq!(
            parse_deep_link("vocab", "VOCAB://word/en_1"),
            link("en_1", InjectSource::Deeplink)
        );
        assert_eq!(
            parse_deep_link("Vocab", "vocab:///word/ja_1#top"),
            link("ja_1", InjectSource::Deeplink)
        );
    }

    #[test]
    fn decodes_and_trims_ids() {
        assert_eq!(
            parse_deep_link("vocab", "vocab://word/%20en_3%20"),
            link("en_3", InjectSource::Deeplink)
        );
        assert_eq!(
            parse_deep_link("vocab", "vocab://word/ja_1?source=bogus"),
            link("ja_1", InjectSource::Deeplink)
        );
    }

    #[test]
    fn rejects_other_links() {
        assert_eq!(parse_deep_link("vocab", "vocab://word/"), None);
        assert_eq!(parse_deep_link("vocab", "vocab://word/%20"), None);
        assert_eq!(parse_deep_link("vocab", "other://word/en_1"), None);
        assert_eq!(parse_deep_link("vocab", "vocab://saved"), None);
        assert_eq!(parse_deep_link("vocab", "vocab://word/%FF"), None);
        assert_eq!(parse_deep_link("vocab", "vocab://word/a/b"), None);
        assert_eq!(parse_deep_link("vocab", "not a link"), None);
    }
}
