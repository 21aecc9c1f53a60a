// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::{VideoRecord, MAX_VIDEOS};
use crate::extract::structured;
use crate::utils::url_utils;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// 直链视频文件的扩展名
const DIRECT_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".m3u8", ".mov", ".ogv"];

static YOUTUBE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{6,})")
        .unwrap()
});
static VIMEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com/(?:video/)?(\d+)").unwrap());
static DAILYMOTION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"dailymotion\.com/(?:embed/)?video/([A-Za-z0-9]+)").unwrap());
static SCRIPT_MEDIA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'\\]+?\.(?:mp4|m3u8|webm)[^\s"'\\]*"#).unwrap());

/// 从HTML中提取视频记录
///
/// 候选来源：video/source标签、嵌入iframe、og:video与twitter:player元标签、
/// 指向视频平台或直链文件的锚点、data属性、内联脚本中的媒体URL、
/// JSON-LD VideoObject。已知平台的候选展开为规范观看URL并派生封面图。
/// 直链视频排在嵌入式之前。
pub fn extract_videos(html: &str, base: &Url) -> Vec<VideoRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut videos: Vec<VideoRecord> = Vec::new();

    let mut push = |record: VideoRecord| {
        if is_valid_candidate(&record.url) && seen.insert(record.url.clone()) {
            videos.push(record);
        }
    };

    for node in structured::typed_nodes(html, "VideoObject") {
        let url = structured::string_field(&node, "contentUrl")
            .or_else(|| structured::string_field(&node, "embedUrl"));
        if let Some(url) = url.and_then(|u| resolve(&u, base)) {
            let mut record = expand_provider(&url);
            record.title = structured::string_field(&node, "name").unwrap_or_default();
            if record.poster.is_empty() {
                record.poster =
                    structured::string_field(&node, "thumbnailUrl").unwrap_or_default();
            }
            record.duration = structured::string_field(&node, "duration").unwrap_or_default();
            push(record);
        }
    }

    let document = Html::parse_document(html);

    let video_sel = Selector::parse("video").expect("static selector");
    let source_sel = Selector::parse("source").expect("static selector");
    for video in document.select(&video_sel) {
        let poster = video
            .value()
            .attr("poster")
            .and_then(|p| resolve(p, base))
            .unwrap_or_default();
        let width = parse_dim(video.value().attr("width"));
        let height = parse_dim(video.value().attr("height"));

        let mut sources: Vec<(String, String)> = Vec::new();
        if let Some(src) = video.value().attr("src") {
            sources.push((src.to_string(), String::new()));
        }
        for source in video.select(&source_sel) {
            if let Some(src) = source.value().attr("src") {
                let mime = source.value().attr("type").unwrap_or("").to_string();
                sources.push((src.to_string(), mime));
            }
        }
        for (src, mime) in sources {
            if let Some(url) = resolve(&src, base) {
                push(VideoRecord {
                    url,
                    title: String::new(),
                    poster: poster.clone(),
                    duration: String::new(),
                    width,
                    height,
                    provider: "direct".to_string(),
                    mime_type: mime,
                    is_embedded: false,
                });
            }
        }
    }

    let iframe_sel = Selector::parse("iframe[src]").expect("static selector");
    for iframe in document.select(&iframe_sel) {
        let src = iframe.value().attr("src").unwrap_or("");
        if let Some(url) = resolve(src, base) {
            if provider_of(&url) != "direct" {
                let mut record = expand_provider(&url);
                record.title = iframe.value().attr("title").unwrap_or("").to_string();
                record.width = parse_dim(iframe.value().attr("width"));
                record.height = parse_dim(iframe.value().attr("height"));
                push(record);
            }
        }
    }

    let meta_sel = Selector::parse(
        r#"meta[property="og:video"], meta[property="og:video:url"],
           meta[property="og:video:secure_url"], meta[name="twitter:player"]"#,
    )
    .expect("static selector");
    for meta in document.select(&meta_sel) {
        if let Some(content) = meta.value().attr("content") {
            if let Some(url) = resolve(content, base) {
                push(expand_provider(&url));
            }
        }
    }

    let anchor_sel = Selector::parse("a[href]").expect("static selector");
    for anchor in document.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        if let Some(url) = resolve(href, base) {
            let lower = url.to_lowercase();
            let is_direct_file = DIRECT_EXTENSIONS
                .iter()
                .any(|ext| lower.split('?').next().unwrap_or("").ends_with(ext));
            if is_direct_file || provider_of(&url) != "direct" {
                let mut record = expand_provider(&url);
                if record.title.is_empty() {
                    record.title = anchor.text().collect::<String>().trim().to_string();
                }
                push(record);
            }
        }
    }

    let data_sel = Selector::parse("[data-video], [data-video-url], [data-mp4]")
        .expect("static selector");
    for element in document.select(&data_sel) {
        for attr in ["data-video", "data-video-url", "data-mp4"] {
            if let Some(src) = element.value().attr(attr) {
                if let Some(url) = resolve(src, base) {
                    push(expand_provider(&url));
                }
            }
        }
    }

    let script_sel = Selector::parse("script").expect("static selector");
    for script in document.select(&script_sel) {
        if script.value().attr("type") == Some("application/ld+json") {
            continue;
        }
        let text = script.text().collect::<String>();
        for m in SCRIPT_MEDIA_RE.find_iter(&text) {
            if let Some(url) = resolve(m.as_str(), base) {
                push(expand_provider(&url));
            }
        }
    }

    // Direct files carry more signal than embeds, stable within each group
    videos.sort_by_key(|v| v.is_embedded);
    videos
}

/// 判断视频候选URL是否有效
fn is_valid_candidate(url: &str) -> bool {
    !(url.is_empty()
        || url.starts_with("blob:")
        || url.starts_with("about:")
        || url.starts_with("javascript:")
        || url.starts_with("data:"))
}

/// 识别URL所属的视频平台
pub fn provider_of(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        "youtube"
    } else if lower.contains("vimeo.com") {
        "vimeo"
    } else if lower.contains("dailymotion.com") {
        "dailymotion"
    } else if lower.contains("wistia.com") || lower.contains("wistia.net") {
        "wistia"
    } else {
        "direct"
    }
}

/// 将平台URL展开为规范观看URL并派生封面图
///
/// YouTube与Dailymotion的封面图可由视频ID直接构造；
/// Vimeo仅规范化URL。未知平台按直链处理。
pub fn expand_provider(url: &str) -> VideoRecord {
    let provider = provider_of(url);
    let mut record = VideoRecord {
        url: url.to_string(),
        title: String::new(),
        poster: String::new(),
        duration: String::new(),
        width: 0,
        height: 0,
        provider: provider.to_string(),
        mime_type: String::new(),
        is_embedded: provider != "direct",
    };

    match provider {
        "youtube" => {
            if let Some(cap) = YOUTUBE_ID_RE.captures(url) {
                let id = &cap[1];
                record.url = format!("https://www.youtube.com/watch?v={}", id);
                record.poster = format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id);
            }
        }
        "vimeo" => {
            if let Some(cap) = VIMEO_ID_RE.captures(url) {
                record.url = format!("https://vimeo.com/{}", &cap[1]);
            }
        }
        "dailymotion" => {
            if let Some(cap) = DAILYMOTION_ID_RE.captures(url) {
                let id = &cap[1];
                record.url = format!("https://www.dailymotion.com/video/{}", id);
                record.poster =
                    format!("https://www.dailymotion.com/thumbnail/video/{}", id);
            }
        }
        _ => {}
    }

    record
}

/// 从播放页正文中挖掘直链媒体URL
///
/// 供内嵌条目的播放页展开使用，扫描脚本与属性中的
/// mp4/m3u8/webm绝对URL，去重并保持出现顺序。
pub fn direct_media_urls(html: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    SCRIPT_MEDIA_RE
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .filter(|url| is_valid_candidate(url) && seen.insert(url.clone()))
        .collect()
}

/// 将播放页挖掘到的直链URL合并进视频列表
///
/// 已存在的URL跳过，新条目作为直链记录加入，
/// 重排为直链在前并截断到上限。
///
/// # 返回值
///
/// 实际并入的新条目数
pub fn merge_direct_urls(videos: &mut Vec<VideoRecord>, found: Vec<String>) -> usize {
    let mut existing: HashSet<String> = videos.iter().map(|v| v.url.clone()).collect();
    let mut merged = 0usize;

    for url in found {
        if !existing.insert(url.clone()) {
            continue;
        }
        videos.push(VideoRecord {
            url,
            title: String::new(),
            poster: String::new(),
            duration: String::new(),
            width: 0,
            height: 0,
            provider: "direct".to_string(),
            mime_type: String::new(),
            is_embedded: false,
        });
        merged += 1;
    }

    if merged > 0 {
        videos.sort_by_key(|v| v.is_embedded);
        videos.truncate(MAX_VIDEOS);
    }
    merged
}

fn resolve(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let resolved = url_utils::resolve_url(base, trimmed).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(resolved.to_string())
}

fn parse_dim(attr: Option<&str>) -> u32 {
    attr.and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_video_tag_with_sources() {
        let html = r#"
            <video poster="/poster.jpg" width="1280" height="720">
                <source src="/clip.mp4" type="video/mp4">
                <source src="/clip.webm" type="video/webm">
            </video>
        "#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].url, "https://example.com/clip.mp4");
        assert_eq!(videos[0].poster, "https://example.com/poster.jpg");
        assert_eq!(videos[0].mime_type, "video/mp4");
        assert!(!videos[0].is_embedded);
        assert_eq!(videos[0].width, 1280);
    }

    #[test]
    fn test_youtube_iframe_expanded() {
        let html = r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ" title="Clip"></iframe>"#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            videos[0].poster,
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert_eq!(videos[0].provider, "youtube");
        assert!(videos[0].is_embedded);
        assert_eq!(videos[0].title, "Clip");
    }

    #[test]
    fn test_direct_sorted_before_embedded() {
        let html = r#"
            <iframe src="https://player.vimeo.com/video/12345"></iframe>
            <video src="/direct.mp4"></video>
        "#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 2);
        assert!(!videos[0].is_embedded);
        assert_eq!(videos[1].url, "https://vimeo.com/12345");
    }

    #[test]
    fn test_json_ld_video_object() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": "VideoObject", "name": "Demo", "contentUrl": "https://cdn.example.com/demo.mp4",
             "thumbnailUrl": "https://cdn.example.com/demo.jpg", "duration": "PT2M"}
            </script>"#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Demo");
        assert_eq!(videos[0].duration, "PT2M");
        assert_eq!(videos[0].poster, "https://cdn.example.com/demo.jpg");
    }

    #[test]
    fn test_blob_and_duplicate_candidates_dropped() {
        let html = r#"
            <video src="blob:https://example.com/abc"></video>
            <video src="/a.mp4"></video>
            <a href="/a.mp4">download</a>
        "#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 1);
    }

    #[test]
    fn test_inline_script_media_url() {
        let html = r#"<script>var player = {src: "https://cdn.example.com/stream.m3u8?token=1"};</script>"#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 1);
        assert!(videos[0].url.contains("stream.m3u8"));
    }

    #[test]
    fn test_direct_media_urls_from_player_page() {
        let html = r#"
            <script>var config = {"streams": ["https://cdn.example.com/v/master.m3u8",
                "https://cdn.example.com/v/fallback.mp4?sig=x"]};</script>
            <script>preload("https://cdn.example.com/v/master.m3u8");</script>
        "#;
        let urls = direct_media_urls(html);
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/v/master.m3u8",
                "https://cdn.example.com/v/fallback.mp4?sig=x"
            ]
        );
    }

    #[test]
    fn test_merge_direct_urls_into_embeds() {
        let mut videos = vec![expand_provider("https://www.youtube.com/embed/dQw4w9WgXcQ")];
        let merged = merge_direct_urls(
            &mut videos,
            vec![
                "https://cdn.example.com/v/master.m3u8".to_string(),
                "https://cdn.example.com/v/master.m3u8".to_string(),
            ],
        );
        assert_eq!(merged, 1);
        assert_eq!(videos.len(), 2);
        assert!(!videos[0].is_embedded);
        assert_eq!(videos[0].url, "https://cdn.example.com/v/master.m3u8");
        assert!(videos[1].is_embedded);
    }

    #[test]
    fn test_og_video_meta() {
        let html = r#"<meta property="og:video:secure_url" content="https://example.com/og.mp4">"#;
        let videos = extract_videos(html, &base());
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].provider, "direct");
    }
}
