//! Orchestrates one wizard run: key check, plan, media, state transitions.

use crate::config::Settings;
use crate::credentials::{CredentialProvider, KeySelector};
use crate::error::{Result, StoryError};
use crate::media::{MediaGenerator, MediaRef, MediaService, MediaType};
use crate::plan::{ContentPlan, GeminiPlanner, PlanGenerator, StoryRequest};
use crate::session::{Generation, Session};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shown while the key-selection flow is open.
pub const KEY_SELECTION_MESSAGE: &str = "비디오 생성을 위해 API 키 선택이 필요합니다...";

/// Shown while Veo renders the video.
pub const VIDEO_LOADING_MESSAGE: &str =
    "Veo가 애니메이션 영상을 생성하고 있습니다...\n(동영상 생성은 1~2분 정도 소요됩니다. 잠시만 기다려주세요!)";

/// Shown while the poster is drawn.
pub const IMAGE_LOADING_MESSAGE: &str =
    "나노바나나가 포스터 이미지를 그리고 있습니다...\n(거의 다 됐어요!)";

/// The only error text users see, whatever went wrong.
pub const GENERIC_ERROR_MESSAGE: &str = "오류가 발생했습니다. 잠시 후 다시 시도해주세요.";

/// Planning screen message for a content format.
pub fn plan_loading_message(content_type: &str) -> String {
    format!(
        "부산의 역사를 검색하고 '{content_type}' 기획을 시작합니다...\n(역사적 사실과 감정을 연결하고 있어요)"
    )
}

/// Drives a [`Session`] through plan and media generation.
#[derive(Clone)]
pub struct Storyteller {
    planner: Arc<dyn PlanGenerator>,
    media: Arc<dyn MediaGenerator>,
    key_selector: Option<Arc<dyn KeySelector>>,
    session: Arc<Mutex<Session>>,
}

impl std::fmt::Debug for Storyteller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storyteller")
            .field("key_selector", &self.key_selector.is_some())
            .finish_non_exhaustive()
    }
}

impl Storyteller {
    /// Creates an orchestrator with a fresh session.
    pub fn new(planner: Arc<dyn PlanGenerator>, media: Arc<dyn MediaGenerator>) -> Self {
        Self {
            planner,
            media,
            key_selector: None,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }

    /// Wires the Gemini planner and media service from settings.
    pub fn from_settings(settings: &Settings, credentials: Arc<dyn CredentialProvider>) -> Self {
        let planner = GeminiPlanner::builder()
            .credentials(credentials.clone())
            .model(&settings.text_model)
            .base_url(&settings.api_base_url)
            .build();
        let media = MediaService::from_settings(settings, credentials);
        Self::new(Arc::new(planner), Arc::new(media))
    }

    /// Enables the key check before video runs.
    pub fn with_key_selector(mut self, selector: Arc<dyn KeySelector>) -> Self {
        self.key_selector = Some(selector);
        self
    }

    /// Shared handle to the session, for observers such as a progress view.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }

    /// Returns the session to the input step and releases the shown media.
    pub async fn reset(&self) {
        let previous = {
            let mut session = self.session.lock().await;
            let media = session.media().cloned();
            session.reset();
            media
        };
        if let Some(media) = previous {
            self.media.discard(&media).await;
        }
    }

    /// Runs the wizard for one request and returns the resulting state.
    ///
    /// Fails only when the request is invalid or the session is not on the
    /// input step. Generation failures end on the error step instead.
    pub async fn submit(&self, request: StoryRequest) -> Result<Session> {
        request.validate()?;
        let token = self.session.lock().await.begin()?;
        tracing::info!(
            place = %request.place,
            emotion = %request.emotion,
            content_type = %request.content_type,
            "starting story generation"
        );

        match self.run(token, &request).await {
            Ok(Some((plan, media))) => {
                let produced = media.clone();
                let outcome = self.session.lock().await.complete(token, plan, media);
                match outcome {
                    Ok(true) => tracing::info!("story generation complete"),
                    Ok(false) => {
                        tracing::debug!("discarding result of a stale run");
                        self.media.discard(&produced).await;
                    }
                    Err(e) => {
                        tracing::error!("error generating story: {e}");
                        self.session.lock().await.fail(token, GENERIC_ERROR_MESSAGE);
                    }
                }
            }
            Ok(None) => tracing::debug!("run superseded before completion"),
            Err(e) => {
                tracing::error!("error generating story: {e}");
                self.session.lock().await.fail(token, GENERIC_ERROR_MESSAGE);
            }
        }

        Ok(self.snapshot().await)
    }

    /// Returns `None` as soon as the run is no longer current.
    async fn run(
        &self,
        token: Generation,
        request: &StoryRequest,
    ) -> Result<Option<(ContentPlan, MediaRef)>> {
        let kind = request.media_type();

        if kind == MediaType::Video {
            if let Some(selector) = &self.key_selector {
                if !selector.has_selected_key().await {
                    if !self.set_loading(token, KEY_SELECTION_MESSAGE).await {
                        return Ok(None);
                    }
                    selector.open_select_key().await?;
                    if !selector.has_selected_key().await {
                        return Err(StoryError::Auth("no API key selected".into()));
                    }
                }
            }
        }

        if !self
            .set_loading(token, plan_loading_message(&request.content_type))
            .await
        {
            return Ok(None);
        }
        let plan = self
            .planner
            .generate_plan(&request.place, &request.emotion, &request.content_type)
            .await?;

        let url = match kind {
            MediaType::Video => {
                if !self.set_loading(token, VIDEO_LOADING_MESSAGE).await {
                    return Ok(None);
                }
                self.media.generate_video(&plan.visual_prompt).await?
            }
            MediaType::Image => {
                if !self.set_loading(token, IMAGE_LOADING_MESSAGE).await {
                    return Ok(None);
                }
                self.media.generate_image(&plan.visual_prompt).await
            }
        };

        Ok(Some((plan, MediaRef::new(kind, url))))
    }

    async fn set_loading(&self, token: Generation, message: impl Into<String>) -> bool {
        self.session.lock().await.set_loading(token, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Step;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    type Log = Arc<StdMutex<Vec<String>>>;

    fn plan_for(place: &str, emotion: &str, content_type: &str) -> ContentPlan {
        ContentPlan {
            place: place.into(),
            emotion: emotion.into(),
            history_facts: "한국전쟁 피란민".into(),
            synopsis: "계단에서 기다리는 그녀".into(),
            content_type: content_type.into(),
            key_message: "기다림".into(),
            target_audience: "모두".into(),
            visual_prompt: "old stairs in Busan at dusk".into(),
            social_caption: "럭키비키 🍀".into(),
            grounding_urls: Vec::new(),
        }
    }

    struct FakePlanner {
        log: Log,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl PlanGenerator for FakePlanner {
        async fn generate_plan(
            &self,
            place: &str,
            emotion: &str,
            content_type: &str,
        ) -> Result<ContentPlan> {
            self.log.lock().unwrap().push(format!("plan:{content_type}"));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(StoryError::Generation(
                    "Failed to generate a valid plan format.".into(),
                ));
            }
            Ok(plan_for(place, emotion, content_type))
        }
    }

    struct FakeMedia {
        log: Log,
        video_fails: bool,
        image_url: String,
    }

    #[async_trait]
    impl MediaGenerator for FakeMedia {
        async fn generate_image(&self, prompt: &str) -> String {
            self.log.lock().unwrap().push(format!("image:{prompt}"));
            self.image_url.clone()
        }

        async fn generate_video(&self, prompt: &str) -> Result<String> {
            self.log.lock().unwrap().push(format!("video:{prompt}"));
            if self.video_fails {
                return Err(StoryError::Timeout(std::time::Duration::from_secs(600)));
            }
            Ok("file:///tmp/story-1.mp4".into())
        }

        async fn discard(&self, media: &MediaRef) {
            self.log.lock().unwrap().push(format!("discard:{}", media.url));
        }
    }

    struct FakeSelector {
        log: Log,
        selected: AtomicBool,
        selects_on_open: bool,
    }

    #[async_trait]
    impl KeySelector for FakeSelector {
        async fn has_selected_key(&self) -> bool {
            self.log.lock().unwrap().push("has_key".into());
            self.selected.load(Ordering::SeqCst)
        }

        async fn open_select_key(&self) -> Result<()> {
            self.log.lock().unwrap().push("open_select".into());
            if self.selects_on_open {
                self.selected.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct Harness {
        log: Log,
        app: Storyteller,
    }

    fn harness(plan_fails: bool, video_fails: bool) -> Harness {
        let log: Log = Arc::default();
        let planner = FakePlanner {
            log: log.clone(),
            fail: plan_fails,
            gate: None,
        };
        let media = FakeMedia {
            log: log.clone(),
            video_fails,
            image_url: "data:image/png;base64,AAAA".into(),
        };
        Harness {
            app: Storyteller::new(Arc::new(planner), Arc::new(media)),
            log,
        }
    }

    fn selector(log: &Log, selected: bool, selects_on_open: bool) -> Arc<FakeSelector> {
        Arc::new(FakeSelector {
            log: log.clone(),
            selected: AtomicBool::new(selected),
            selects_on_open,
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_plan_loading_message() {
        assert_eq!(
            plan_loading_message("전시회"),
            "부산의 역사를 검색하고 '전시회' 기획을 시작합니다...\n(역사적 사실과 감정을 연결하고 있어요)"
        );
    }

    #[tokio::test]
    async fn test_short_film_produces_poster() {
        let h = harness(false, false);
        let session = h
            .app
            .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
            .await
            .unwrap();

        assert_eq!(session.step(), Step::Result);
        assert_eq!(session.plan().unwrap().content_type, "단편 영화");
        let media = session.media().unwrap();
        assert_eq!(media.kind, MediaType::Image);
        assert_eq!(media.url, "data:image/png;base64,AAAA");
        assert_eq!(
            entries(&h.log),
            vec!["plan:단편 영화", "image:old stairs in Busan at dusk"]
        );
    }

    #[tokio::test]
    async fn test_animation_checks_key_before_planning() {
        let h = harness(false, false);
        let app = h.app.with_key_selector(selector(&h.log, false, true));

        let session = app
            .submit(StoryRequest::new("영도다리", "희망", "애니메이션"))
            .await
            .unwrap();

        assert_eq!(session.step(), Step::Result);
        assert_eq!(session.media().unwrap().kind, MediaType::Video);
        assert_eq!(session.media().unwrap().url, "file:///tmp/story-1.mp4");
        assert_eq!(
            entries(&h.log),
            vec![
                "has_key",
                "open_select",
                "has_key",
                "plan:애니메이션",
                "video:old stairs in Busan at dusk"
            ]
        );
    }

    #[tokio::test]
    async fn test_animation_with_selected_key_skips_selection() {
        let h = harness(false, false);
        let app = h.app.with_key_selector(selector(&h.log, true, false));

        app.submit(StoryRequest::new("영도다리", "희망", "애니메이션"))
            .await
            .unwrap();
        assert_eq!(entries(&h.log)[..2], ["has_key", "plan:애니메이션"]);
    }

    #[tokio::test]
    async fn test_animation_without_key_after_selection_fails() {
        let h = harness(false, false);
        let app = h.app.with_key_selector(selector(&h.log, false, false));

        let session = app
            .submit(StoryRequest::new("영도다리", "희망", "애니메이션"))
            .await
            .unwrap();
        assert_eq!(session.step(), Step::Error);
        assert_eq!(session.error(), Some(GENERIC_ERROR_MESSAGE));
        assert_eq!(entries(&h.log), vec!["has_key", "open_select", "has_key"]);
    }

    #[tokio::test]
    async fn test_image_formats_never_consult_key_selector() {
        let h = harness(false, false);
        let app = h.app.with_key_selector(selector(&h.log, false, false));

        let session = app
            .submit(StoryRequest::new("감천문화마을", "따뜻함", "전시회"))
            .await
            .unwrap();
        assert_eq!(session.step(), Step::Result);
        assert!(!entries(&h.log).iter().any(|e| e == "has_key"));
    }

    #[tokio::test]
    async fn test_unparseable_plan_ends_in_error() {
        let h = harness(true, false);
        let session = h
            .app
            .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
            .await
            .unwrap();

        assert_eq!(session.step(), Step::Error);
        assert_eq!(session.error(), Some(GENERIC_ERROR_MESSAGE));
        assert!(session.plan().is_none());
        assert_eq!(entries(&h.log), vec!["plan:단편 영화"]);
    }

    #[tokio::test]
    async fn test_video_failure_ends_in_error() {
        let h = harness(false, true);
        let session = h
            .app
            .submit(StoryRequest::new("영도다리", "희망", "애니메이션"))
            .await
            .unwrap();
        assert_eq!(session.step(), Step::Error);
        assert!(session.media().is_none());
    }

    #[tokio::test]
    async fn test_empty_media_url_ends_in_error() {
        let log: Log = Arc::default();
        let planner = FakePlanner {
            log: log.clone(),
            fail: false,
            gate: None,
        };
        let media = FakeMedia {
            log,
            video_fails: false,
            image_url: String::new(),
        };
        let app = Storyteller::new(Arc::new(planner), Arc::new(media));

        let session = app
            .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
            .await
            .unwrap();
        assert_eq!(session.step(), Step::Error);
    }

    #[tokio::test]
    async fn test_invalid_request_stays_on_input() {
        let h = harness(false, false);
        let err = h
            .app
            .submit(StoryRequest::new(" ", "그리움", "단편 영화"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoryError::InvalidRequest(_)));
        assert_eq!(h.app.snapshot().await.step(), Step::Input);
        assert!(entries(&h.log).is_empty());
    }

    #[tokio::test]
    async fn test_reset_then_resubmit() {
        let h = harness(false, false);
        h.app
            .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
            .await
            .unwrap();
        assert!(h
            .app
            .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
            .await
            .is_err());

        h.app.reset().await;
        let session = h.app.snapshot().await;
        assert_eq!(session.step(), Step::Input);
        assert!(session.plan().is_none() && session.media().is_none());

        let session = h
            .app
            .submit(StoryRequest::new("해운대", "설렘", "오디오 드라마"))
            .await
            .unwrap();
        assert_eq!(session.plan().unwrap().place, "해운대");
    }

    #[tokio::test]
    async fn test_reset_during_run_discards_result() {
        let log: Log = Arc::default();
        let gate = Arc::new(Notify::new());
        let planner = FakePlanner {
            log: log.clone(),
            fail: false,
            gate: Some(gate.clone()),
        };
        let media = FakeMedia {
            log: log.clone(),
            video_fails: false,
            image_url: "data:image/png;base64,AAAA".into(),
        };
        let app = Storyteller::new(Arc::new(planner), Arc::new(media));

        let running = tokio::spawn({
            let app = app.clone();
            async move {
                app.submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
                    .await
            }
        });

        while entries(&log).is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(app.snapshot().await.step(), Step::Planning);
        assert_eq!(
            app.snapshot().await.loading_message(),
            plan_loading_message("단편 영화")
        );

        app.reset().await;
        gate.notify_one();
        let session = running.await.unwrap().unwrap();

        assert_eq!(session.step(), Step::Input);
        assert!(session.plan().is_none() && session.media().is_none());
        // Stopped before asking for a poster.
        assert_eq!(entries(&log), vec!["plan:단편 영화"]);
    }

    #[tokio::test]
    async fn test_reset_releases_stored_video() {
        let h = harness(false, false);
        h.app
            .submit(StoryRequest::new("영도다리", "희망", "애니메이션"))
            .await
            .unwrap();
        h.app.reset().await;

        assert_eq!(
            entries(&h.log).last().map(String::as_str),
            Some("discard:file:///tmp/story-1.mp4")
        );
    }

    #[tokio::test]
    async fn test_failing_poster_model_still_reaches_result() {
        use crate::media::{GeneratedImage, GeneratedVideo, ImageProvider, VideoGenerationRequest, VideoProvider};

        struct BrokenImage;

        #[async_trait]
        impl ImageProvider for BrokenImage {
            async fn generate(&self, _prompt: &str) -> Result<GeneratedImage> {
                Err(StoryError::Api {
                    status: 500,
                    message: "internal".into(),
                })
            }
        }

        struct NoVideo;

        #[async_trait]
        impl VideoProvider for NoVideo {
            async fn generate(&self, _request: &VideoGenerationRequest) -> Result<GeneratedVideo> {
                Err(StoryError::VideoGeneration("unused".into()))
            }
        }

        let planner = FakePlanner {
            log: Arc::default(),
            fail: false,
            gate: None,
        };
        let media = MediaService::new(Arc::new(BrokenImage), Arc::new(NoVideo));
        let app = Storyteller::new(Arc::new(planner), Arc::new(media));

        let session = app
            .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
            .await
            .unwrap();
        assert_eq!(session.step(), Step::Result);
        let media = session.media().unwrap();
        assert_eq!(media.kind, MediaType::Image);
        assert_eq!(media.url, "https://picsum.photos/800/800?blur=2");
        assert!(session.error().is_none());
    }
}
