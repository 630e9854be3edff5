//! Plain-text screens for the wizard.

use crate::media::{MediaRef, MediaType};
use crate::plan::ContentPlan;
use crate::session::{Session, Step};
use std::fmt::Write;

/// Account name shown on the social post preview.
pub const SOCIAL_ACCOUNT: &str = "busan_story_official";

const RULE: &str = "────────────────────────────────────────";

/// File name offered when saving the media of a plan.
pub fn download_file_name(place: &str, kind: MediaType) -> String {
    let stem = place.split_whitespace().collect::<Vec<_>>().join("_");
    let ext = match kind {
        MediaType::Video => "mp4",
        MediaType::Image => "png",
    };
    format!("busan_story_{stem}.{ext}")
}

/// The planning document.
pub fn render_plan(plan: &ContentPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "문화 콘텐츠 기획안");
    let _ = writeln!(out, "{} X {}", plan.place, plan.emotion);
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "[역사적 사실]");
    let _ = writeln!(out, "{}", plan.history_facts);
    for link in &plan.grounding_urls {
        let _ = writeln!(out, "  ↗ {} <{}>", link.title, link.uri);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "[스토리 시놉시스]");
    let _ = writeln!(out, "{}", plan.synopsis);
    let _ = writeln!(out);

    let _ = writeln!(out, "콘텐츠 형식: {}", plan.content_type);
    let _ = writeln!(out, "타겟 관객: {}", plan.target_audience);
    let _ = writeln!(out);

    let _ = writeln!(out, "[핵심 메시지]");
    let _ = writeln!(out, "\"{}\"", plan.key_message);
    out
}

/// The social-media post mock-up holding the generated media and caption.
pub fn render_social_post(plan: &ContentPlan, media: &MediaRef) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{SOCIAL_ACCOUNT} · Sponsored");
    let _ = writeln!(out, "{}", describe_media(media));
    let _ = writeln!(out, "저장: {}", download_file_name(&plan.place, media.kind));
    let _ = writeln!(out, "♥  💬  ➤");
    let _ = writeln!(out, "{SOCIAL_ACCOUNT} {}", plan.social_caption);
    let _ = writeln!(out, "View all 40 comments");
    let _ = writeln!(out, "2 HOURS AGO");
    let _ = writeln!(out, "{RULE}");
    out
}

fn describe_media(media: &MediaRef) -> String {
    let label = match media.kind {
        MediaType::Image => "[포스터 1:1]",
        MediaType::Video => "[영상 9:16 ▶]",
    };
    if media.is_inline() {
        let mime = media
            .url
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("application/octet-stream");
        let size = media.inline_bytes().map(|b| b.len()).unwrap_or(0);
        format!("{label} inline {mime}, {size} bytes")
    } else {
        format!("{label} {}", media.url)
    }
}

/// The planning screen.
pub fn render_loading(message: &str) -> String {
    format!("⏳ {message}\n")
}

/// The error screen.
pub fn render_error(message: &str) -> String {
    format!("오류가 발생했어요\n{message}\n\n[다시 시도하기]\n")
}

/// Renders whatever the session is showing.
pub fn render_session(session: &Session) -> String {
    match session.step() {
        Step::Input => "부산의 장소와 감정을 입력해주세요.\n".to_string(),
        Step::Planning => render_loading(session.loading_message()),
        Step::Result => match (session.plan(), session.media()) {
            (Some(plan), Some(media)) => {
                format!(
                    "{}\n{}\n[새로운 기획하기]\n",
                    render_plan(plan),
                    render_social_post(plan, media)
                )
            }
            _ => String::new(),
        },
        Step::Error => render_error(session.error().unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::GroundingUrl;

    fn plan() -> ContentPlan {
        ContentPlan {
            place: "40계단 문화관".into(),
            emotion: "그리움".into(),
            history_facts: "한국전쟁 당시 피란민들이 모이던 곳".into(),
            synopsis: "계단 위에서 가족을 기다리는 소녀".into(),
            content_type: "단편 영화".into(),
            key_message: "기다림은 희망이다".into(),
            target_audience: "20-30대".into(),
            visual_prompt: "stairs".into(),
            social_caption: "완전 럭키비키잖아 🍀 #부산".into(),
            grounding_urls: vec![GroundingUrl {
                title: "40계단".into(),
                uri: "https://example.com/40".into(),
            }],
        }
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(
            download_file_name("40계단 문화관", MediaType::Image),
            "busan_story_40계단_문화관.png"
        );
        assert_eq!(
            download_file_name("영도  다리", MediaType::Video),
            "busan_story_영도_다리.mp4"
        );
    }

    #[test]
    fn test_render_plan_sections() {
        let text = render_plan(&plan());
        assert!(text.starts_with("문화 콘텐츠 기획안\n40계단 문화관 X 그리움\n"));
        assert!(text.contains("[역사적 사실]\n한국전쟁 당시 피란민들이 모이던 곳\n  ↗ 40계단 <https://example.com/40>\n"));
        assert!(text.contains("콘텐츠 형식: 단편 영화"));
        assert!(text.contains("타겟 관객: 20-30대"));
        assert!(text.contains("\"기다림은 희망이다\""));
    }

    #[test]
    fn test_render_plan_without_citations() {
        let mut p = plan();
        p.grounding_urls.clear();
        assert!(!render_plan(&p).contains('↗'));
    }

    #[test]
    fn test_render_social_post_inline_poster() {
        let media = MediaRef::new(MediaType::Image, "data:image/png;base64,AQID");
        let text = render_social_post(&plan(), &media);
        assert!(text.contains("busan_story_official · Sponsored"));
        assert!(text.contains("[포스터 1:1] inline image/png, 3 bytes"));
        assert!(text.contains("busan_story_official 완전 럭키비키잖아 🍀 #부산"));
        assert!(!text.contains("AQID"));
    }

    #[test]
    fn test_render_social_post_video() {
        let media = MediaRef::new(MediaType::Video, "file:///tmp/story-1.mp4");
        let text = render_social_post(&plan(), &media);
        assert!(text.contains("[영상 9:16 ▶] file:///tmp/story-1.mp4"));
        assert!(text.contains("저장: busan_story_40계단_문화관.mp4"));
    }

    #[test]
    fn test_render_error_screen() {
        let text = render_error("오류가 발생했습니다. 잠시 후 다시 시도해주세요.");
        assert!(text.starts_with("오류가 발생했어요\n"));
        assert!(text.contains("다시 시도하기"));
    }

    #[test]
    fn test_render_session_by_step() {
        let mut session = Session::new();
        assert!(render_session(&session).contains("입력해주세요"));

        let token = session.begin().unwrap();
        session.set_loading(token, "기획 중");
        assert_eq!(render_session(&session), "⏳ 기획 중\n");

        let media = MediaRef::new(MediaType::Image, "https://picsum.photos/800/800?blur=2");
        session.complete(token, plan(), media).unwrap();
        let text = render_session(&session);
        assert!(text.contains("문화 콘텐츠 기획안"));
        assert!(text.contains("[포스터 1:1] https://picsum.photos/800/800?blur=2"));
        assert!(text.ends_with("[새로운 기획하기]\n"));
    }
}
