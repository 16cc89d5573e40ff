use crate::error::{Result, UpdraftError};
use url::Url;

/// Build the canonical download URL understood by a plugin repository:
/// `<base>?action=download&id=<id>&build=<build>&uuid=<uuid>`
pub fn download_url(base: &str, id: &str, build: Option<&str>, uuid: &str) -> Result<String> {
    let mut url = parse(base)?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("action", "download");
        pairs.append_pair("id", id);
        if let Some(build) = build {
            pairs.append_pair("build", build);
        }
        pairs.append_pair("uuid", uuid);
    }

    Ok(url.to_string())
}

/// Resolve an artifact URL a repository announced. Repositories may hand
/// out URLs relative to themselves; those are joined against `base`.
pub fn resolve_source_url(raw: &str, base: Option<&str>) -> Result<String> {
    match Url::parse(raw) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| UpdraftError::InvalidUrl {
                url: raw.to_string(),
                message: "relative URL without a repository to resolve against".to_string(),
            })?;
            let joined = parse(base)?.join(raw).map_err(|e| UpdraftError::InvalidUrl {
                url: raw.to_string(),
                message: e.to_string(),
            })?;
            Ok(joined.to_string())
        }
        Err(e) => Err(UpdraftError::InvalidUrl {
            url: raw.to_string(),
            message: e.to_string(),
        }),
    }
}

fn parse(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| UpdraftError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}
