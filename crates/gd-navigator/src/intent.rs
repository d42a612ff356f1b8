//! Boundary classification of incoming URIs.

use crate::input::InputSubmission;
use gd_config::PluginConfig;
use gd_core::DpiResult;

/// What an incoming `open_url` asks the plugin to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Plain navigation to a protocol URL.
    Navigate(String),
    /// Pin the certificate of `target`'s host, then replay `target`.
    PinCommit { target: String },
    /// A submitted deferred-input form.
    InputSubmit(InputSubmission),
}

impl NavigationIntent {
    /// Derives the intent from the prefix markers on `raw`.
    ///
    /// Fails only for a deferred-input URI that carries no `?q=` value.
    pub fn classify(raw: &str, config: &PluginConfig) -> DpiResult<Self> {
        if let Some(target) = raw.strip_prefix(config.pin_prefix().as_str()) {
            return Ok(Self::PinCommit {
                target: target.to_owned(),
            });
        }

        if let Some(rest) = raw.strip_prefix(config.input_prefix().as_str()) {
            return InputSubmission::parse(rest).map(Self::InputSubmit);
        }

        Ok(Self::Navigate(raw.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationIntent;
    use crate::input::InputSubmission;
    use gd_config::PluginConfig;
    use gd_core::ErrorKind;
    use std::path::Path;

    fn config() -> PluginConfig {
        PluginConfig::for_home(Path::new("/home/user"))
    }

    fn classify(raw: &str) -> NavigationIntent {
        match NavigationIntent::classify(raw, &config()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn plain_url_is_navigation() {
        assert_eq!(
            classify("gemini://example.org/"),
            NavigationIntent::Navigate("gemini://example.org/".to_owned())
        );
    }

    #[test]
    fn pin_prefix_carries_target() {
        assert_eq!(
            classify("gemini:pin:gemini://example.org/docs?x=1"),
            NavigationIntent::PinCommit {
                target: "gemini://example.org/docs?x=1".to_owned()
            }
        );
    }

    #[test]
    fn input_prefix_splits_on_first_query_marker() {
        assert_eq!(
            classify("gemini:input:gemini://example.org/search?q=a+b?q=c"),
            NavigationIntent::InputSubmit(InputSubmission {
                target: "gemini://example.org/search".to_owned(),
                raw_query: "a+b?q=c".to_owned(),
            })
        );
    }

    #[test]
    fn input_without_query_marker_is_malformed() {
        let classified = NavigationIntent::classify("gemini:input:gemini://example.org/", &config());
        assert_eq!(
            classified.map_err(|error| error.kind),
            Err(ErrorKind::MalformedQuery)
        );
    }
}
