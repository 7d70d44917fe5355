//! Share-link construction for the social buttons in the page header.

use url::form_urlencoded::byte_serialize;

/// Social destinations offered on every article page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareTarget {
    X,
    Facebook,
    Line,
    Hatena,
}

impl ShareTarget {
    pub const ALL: [ShareTarget; 4] = [
        ShareTarget::X,
        ShareTarget::Facebook,
        ShareTarget::Line,
        ShareTarget::Hatena,
    ];

    pub fn icon_path(self) -> &'static str {
        match self {
            ShareTarget::X => "/static/public/icons/x.svg",
            ShareTarget::Facebook => "/static/public/icons/facebook.svg",
            ShareTarget::Line => "/static/public/icons/line.svg",
            ShareTarget::Hatena => "/static/public/icons/hatena.svg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShareTarget::X => "X",
            ShareTarget::Facebook => "Facebook",
            ShareTarget::Line => "LINE",
            ShareTarget::Hatena => "Hatena Bookmark",
        }
    }
}

/// Build the outbound share URL for one target. The page URL is always
/// percent-encoded; the title only participates in the X intent.
pub fn share_url(target: ShareTarget, page_url: &str, title: &str) -> String {
    let encoded_url = encode(page_url);
    match target {
        ShareTarget::X => {
            format!(
                "https://twitter.com/share?url={encoded_url}&text={}",
                encode(title)
            )
        }
        ShareTarget::Facebook => {
            format!("https://www.facebook.com/sharer/sharer.php?u={encoded_url}")
        }
        ShareTarget::Line => {
            format!("https://social-plugins.line.me/lineit/share?url={encoded_url}")
        }
        ShareTarget::Hatena => {
            format!("https://b.hatena.ne.jp/entry/panel/?url={encoded_url}")
        }
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x_intent_carries_url_and_title() {
        let url = share_url(ShareTarget::X, "https://blog.example/articles/42", "Hello");
        assert_eq!(
            url,
            "https://twitter.com/share?url=https%3A%2F%2Fblog.example%2Farticles%2F42&text=Hello"
        );
    }

    #[test]
    fn facebook_only_carries_url() {
        let url = share_url(
            ShareTarget::Facebook,
            "https://blog.example/articles/42",
            "ignored",
        );
        assert!(url.starts_with("https://www.facebook.com/sharer/sharer.php?u="));
        assert!(!url.contains("ignored"));
    }

    #[test]
    fn title_is_percent_encoded() {
        let url = share_url(ShareTarget::X, "https://blog.example/a", "spaces & symbols");
        assert!(url.ends_with("text=spaces+%26+symbols"));
    }

    #[test]
    fn hatena_uses_entry_panel() {
        let url = share_url(ShareTarget::Hatena, "https://blog.example/a", "");
        assert_eq!(
            url,
            "https://b.hatena.ne.jp/entry/panel/?url=https%3A%2F%2Fblog.example%2Fa"
        );
    }
}
