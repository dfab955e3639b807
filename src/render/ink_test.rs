use super::*;

#[test]
fn svg_url_uses_unpadded_base64url() {
    // Standard base64 would end in "=".
    let url = ink_url("https://mermaid.ink/", ImageFormat::Svg, "graph TD");
    assert_eq!(url, "https://mermaid.ink/svg/Z3JhcGggVEQ");
}

#[test]
fn png_uses_img_endpoint() {
    let url = ink_url(DEFAULT_INK_URL, ImageFormat::Png, "graph TD");
    assert!(url.starts_with("https://mermaid.ink/img/"));
    assert_eq!(ImageFormat::Png.extension(), "png");
}

#[test]
fn url_safe_alphabet_for_special_bytes() {
    // U+FBFF is "76+/" in the standard alphabet.
    let url = ink_url("http://ink", ImageFormat::Svg, "\u{fbff}");
    assert_eq!(url, "http://ink/svg/76-_");
}
