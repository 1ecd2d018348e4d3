use axum::http::Uri;
use reqwest::Url;

/// Joins the rewrite base and the inbound path, dropping exactly one leading
/// `/` from the latter. A path without one is used whole.
pub(crate) fn rewritten_path(rewrite_base: &str, inbound_path: &str) -> String {
    let suffix = inbound_path.strip_prefix('/').unwrap_or(inbound_path);
    format!("{rewrite_base}{suffix}")
}

/// Resolves `path` against `base` the way a browser resolves a link: an
/// absolute path replaces the base path, a relative one lands in the base
/// path's directory. The base's query and fragment never survive, and any
/// `?` or `#` in `path` stays a literal path character.
pub(crate) fn resolve(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    match path.starts_with('/') {
        true => url.set_path(path),
        false => {
            let directory = base
                .path()
                .rfind('/')
                .map_or("/", |end| &base.path()[..=end]);
            url.set_path(&format!("{directory}{path}"));
        }
    }
    url
}

/// Outbound URL for an inbound request: the rewritten path resolved against
/// the target, carrying the inbound query string verbatim. A bare `?` with
/// nothing after it is dropped.
pub(crate) fn outbound_url(target: &Url, rewrite_base: &str, inbound: &Uri) -> Url {
    let mut url = resolve(target, &rewritten_path(rewrite_base, inbound.path()));
    url.set_query(inbound.query().filter(|query| !query.is_empty()));
    url
}
