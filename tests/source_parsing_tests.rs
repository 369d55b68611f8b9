use chrono::{TimeZone, Utc};
use rust_manga_sources::config::{Config, WeebDexConfig};
use rust_manga_sources::error::SourceError;
use rust_manga_sources::models::{DiscoverSectionItem, SearchQuery};
use rust_manga_sources::sources::{
    self, atsumaru, mangafire, parse_source, qiscans, scyllacomics, weebdex, Source,
};
use rust_manga_sources::vrf::{compute_signature, VrfEncoding};

#[test]
fn test_every_source_resolves_by_name() {
    for source in Source::ALL {
        assert_eq!(parse_source(source.name()), Some(source));
        assert_eq!(source.name().parse::<Source>().unwrap(), source);
    }
    assert!(matches!(
        "mangadex".parse::<Source>(),
        Err(SourceError::UnknownSource(_))
    ));
}

#[test]
fn test_mangafire_requests_carry_signatures() {
    let url = mangafire::search_url(&SearchQuery::titled("Solo  Leveling"), 1);
    let expected = compute_signature("solo leveling", VrfEncoding::Url);
    assert!(url.ends_with(&format!("vrf={}", expected)), "{}", url);

    let url = mangafire::chapter_pages_url("3832635");
    assert!(url.ends_with(&compute_signature("chapter_id@3832635", VrfEncoding::Url)));
}

#[test]
fn test_qiscans_broken_embedded_images_use_reconstruction() {
    let html = r#"<script>self.__next_f.push("images": [{url: broken}])</script>
        <img src="https://media.qiscans.org/file/qiscans/uploads/series/x/ch-1/01.webp">
        <img src="https://media.qiscans.org/file/qiscans/uploads/series/x/ch-1/02.webp">
        <img src="https://media.qiscans.org/uploads/series/x/banner.webp">"#;
    let pages = qiscans::parse_chapter_pages(html).unwrap();
    assert_eq!(
        pages,
        vec![
            "https://media.qiscans.org/uploads/series/x/ch-1/01.webp",
            "https://media.qiscans.org/uploads/series/x/ch-1/02.webp",
        ]
    );
}

#[test]
fn test_qiscans_empty_document_has_no_pages() {
    assert!(matches!(
        qiscans::parse_chapter_pages("<html><body>Chapter removed</body></html>"),
        Err(SourceError::PagesNotFound)
    ));
}

#[test]
fn test_scyllacomics_chapter_flow() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let list = r#"<div id="chapters-list">
        <a href="https://scyllacomics.xyz/manga/night-shift/chapter-10-5">
          <div class="flex"><span>Chapter 10.5</span></div>
          <div class="flex justify-between gap-3"><span class="text-gray-500">just now</span></div></a>
    </div>"#;
    let chapters = scyllacomics::parse_chapters(list, "night-shift", now).unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].chapter_id, "chapter-10-5");
    assert_eq!(chapters[0].chap_num, 10.5);
    assert_eq!(chapters[0].publish_date, Some(now));

    let reader = r#"<div id="chapter-container"><img data-src="https://cdn.scylla/1.webp"><img src="https://cdn.scylla/2.webp"></div>"#;
    assert_eq!(
        scyllacomics::parse_chapter_pages(reader),
        vec!["https://cdn.scylla/1.webp", "https://cdn.scylla/2.webp"]
    );
}

#[test]
fn test_atsumaru_search_and_pages() {
    let body = r#"{"found":1,"hits":[{"document":{"id":"z1","title":"Omniscient Reader","poster":"/static/o.webp","type":"Manhwa"}}]}"#;
    let (items, has_more) = atsumaru::parse_search_results(body, 1).unwrap();
    assert_eq!(items[0].manga_id, "z1");
    assert!(!has_more);

    let read = r#"{"readChapter":{"id":"c","title":"1","pages":[
        {"id":"3","image":"/static/c/3.webp","number":3},
        {"id":"1","image":"/static/c/1.webp","number":1}]}}"#;
    let pages = atsumaru::parse_chapter_pages(read).unwrap();
    assert_eq!(pages[0], "https://atsu.moe/static/c/1.webp");
}

#[test]
fn test_weebdex_details_chapters_and_pages() {
    let config = WeebDexConfig {
        chapter_languages: vec!["en".into()],
        data_saver: true,
        ..Default::default()
    };

    let manga = weebdex::parse_manga_details(
        r#"{"id":"w1","title":"Dandadan","status":"ongoing","content_rating":"suggestive"}"#,
        "w1",
    )
    .unwrap();
    assert_eq!(manga.manga_info.status, "ongoing");
    assert_eq!(manga.manga_info.tag_groups[0].tags[0].title, "Ongoing");

    let feed = r#"{"data":[
        {"id":"e2","chapter":"2","language":"en","published_at":"2024-02-01T00:00:00Z"},
        {"id":"f2","chapter":"2","language":"fr","published_at":"2024-02-02T00:00:00Z"},
        {"id":"e1","chapter":"1","language":"en","published_at":"2024-01-01T00:00:00Z"}
    ]}"#;
    let (chapters, raw_len) = weebdex::parse_chapter_page(feed, &manga.manga_id).unwrap();
    assert_eq!(raw_len, 3);
    let chapters = weebdex::filter_and_index(chapters, &config);
    let ids: Vec<(&str, Option<i64>)> = chapters
        .iter()
        .map(|c| (c.chapter_id.as_str(), c.sorting_index))
        .collect();
    assert_eq!(ids, vec![("e2", Some(1)), ("e1", Some(0))]);

    let chapter = r#"{"id":"e2","data":[{"name":"01.png"}],"data_optimized":[{"name":"01.webp"}]}"#;
    assert_eq!(
        weebdex::parse_chapter_pages(chapter, config.data_saver).unwrap(),
        vec!["https://api.weebdex.org/data/e2/01.webp"]
    );
}

#[test]
fn test_static_discover_sections() {
    assert!(!mangafire::discover_sections().is_empty());
    assert!(!qiscans::discover_sections().is_empty());
    assert!(!scyllacomics::discover_sections().is_empty());
    let ids: Vec<String> = weebdex::discover_sections().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["top-views-24h", "top-views-7d", "top-views-30d", "latest-updates"]);
}

#[tokio::test]
async fn test_unknown_sections_fail_before_any_request() {
    let config = Config::default();
    let client = config.http.create_client().unwrap();
    for source in [Source::QiScans, Source::WeebDex] {
        let result = sources::discover_section_items(&client, &config, source, "no-such-section", None).await;
        assert!(
            matches!(result, Err(SourceError::UnknownSection(ref id)) if id == "no-such-section"),
            "{}",
            source
        );
    }
}

#[test]
fn test_discover_items_serialize_for_the_host() {
    let item = DiscoverSectionItem::ChapterUpdates {
        manga_id: "m".into(),
        chapter_id: "c".into(),
        title: "T".into(),
        image_url: String::new(),
        subtitle: Some("Ch. 1".into()),
    };
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["type"], "chapter_updates");
    assert_eq!(json["chapter_id"], "c");
}
