use crate::{
    ApiClient, AppConfig, AssistantStatus, AvatarRig, AvatarSession, ChatLog, ClipLibrary,
    Direction, ModelOption, Result, SpeakingMode, SpeechAudio,
};

/// Outcome of one user utterance round trip: the reply text plus the
/// synthesized speech, if the backend produced any. The embedder decodes the
/// audio, feeds PCM into the session, and reports playback end.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub reply: String,
    pub speech: Option<SpeechAudio>,
}

/// Top-level façade for one mounted assistant panel: the backend client, the
/// conversation log, and the avatar session, plus the transient flags the
/// status line is derived from.
#[derive(Debug)]
pub struct Assistant {
    api: ApiClient,
    log: ChatLog,
    session: AvatarSession,
    model: ModelOption,
    voice: String,
    speech_speed: f32,
    stt_model: String,
    subtitle: String,
    listening: bool,
    thinking: bool,
}

impl Assistant {
    pub fn new(
        config: &AppConfig,
        token: impl Into<String>,
        model: ModelOption,
        library: ClipLibrary,
        rig: AvatarRig,
    ) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config.api, token)?,
            log: ChatLog::new(),
            session: AvatarSession::new(config, library, rig),
            model,
            voice: config.api.voice.clone(),
            speech_speed: config.api.speech_speed,
            stt_model: config.api.stt_model.clone(),
            subtitle: String::new(),
            listening: false,
            thinking: false,
        })
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn session(&self) -> &AvatarSession {
        &self.session
    }

    /// Latest reply text, for the subtitle overlay.
    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn status(&self) -> AssistantStatus {
        AssistantStatus::from_flags(
            self.listening,
            self.thinking,
            self.session.mode() == SpeakingMode::Talking,
        )
    }

    /// Push-to-talk edge from the embedder's input layer.
    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    /// Advances the avatar by one rendered frame.
    pub fn update(&mut self, delta_seconds: f32) {
        self.session.update(delta_seconds);
    }

    /// Routes decoded speech audio into the avatar's analyzer.
    pub fn push_speech_samples(&mut self, samples: &[f32]) -> Result<()> {
        self.session.push_speech_samples(samples)
    }

    /// Playback-ended signal from the embedder's audio layer.
    pub fn finish_speaking(&mut self) {
        self.session.finish_speaking();
    }

    /// Unmount path.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }

    /// Sends a typed (or transcribed) user message through the full round
    /// trip: log it, ask the backend with the trailing context, log and
    /// subtitle the reply, synthesize speech, and enter the speaking state
    /// when synthesis produced audio. A failed synthesis simply skips the
    /// speaking state.
    pub async fn submit_text(&mut self, text: &str) -> ChatTurn {
        self.thinking = true;
        self.log.push(text, Direction::Outgoing);
        let context = self.log.context();

        let reply = self
            .api
            .send_chat_message(text, &context, &self.model.api_name)
            .await;
        self.log.push(reply.clone(), Direction::Incoming);
        self.subtitle = reply.clone();

        let speech = self
            .api
            .text_to_speech(&reply, &self.voice, self.speech_speed)
            .await;
        self.thinking = false;

        if speech.is_some() {
            self.session.start_speaking();
        }

        ChatTurn { reply, speech }
    }

    /// Full push-to-talk round trip from a finished recording. An empty
    /// transcript ends the turn quietly.
    pub async fn submit_recording(&mut self, audio: Vec<u8>) -> Option<ChatTurn> {
        self.listening = false;
        self.thinking = true;

        let transcript = self.api.speech_to_text(audio, &self.stt_model).await;
        if transcript.is_empty() {
            self.thinking = false;
            return None;
        }

        Some(self.submit_text(&transcript).await)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{AnimationClip, ApiConfig, MeshPart, CHAT_ERROR_REPLY, MOUTH_OPEN_TARGET};

    fn assistant(server: &MockServer) -> Assistant {
        let config = AppConfig {
            api: ApiConfig {
                base_url: server.uri(),
                ..ApiConfig::default()
            },
            ..AppConfig::default()
        };
        let clips = |prefix: &str| {
            (0..8)
                .map(|i| AnimationClip::new(format!("{prefix}_{i}"), 3.0))
                .collect::<Vec<_>>()
        };
        let library = ClipLibrary::new(clips("idle"), clips("talk")).unwrap();
        let rig = AvatarRig::new(vec![MeshPart::new("head", [MOUTH_OPEN_TARGET])]);
        let model = ModelOption {
            name: "GPT".to_string(),
            api_name: "gpt".to_string(),
        };
        Assistant::new(&config, "token", model, library, rig).unwrap()
    }

    #[tokio::test]
    async fn a_turn_logs_both_sides_and_enters_speaking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/llm/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("good day"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tts/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(b"audio".to_vec()),
            )
            .mount(&server)
            .await;

        let mut assistant = assistant(&server);
        let turn = assistant.submit_text("hello").await;

        assert_eq!(turn.reply, "good day");
        assert!(turn.speech.is_some());
        assert_eq!(assistant.log().messages().len(), 2);
        assert_eq!(assistant.subtitle(), "good day");
        assert_eq!(assistant.status(), AssistantStatus::Speaking);

        assistant.finish_speaking();
        assert_eq!(assistant.status(), AssistantStatus::HoldToTalk);
    }

    #[tokio::test]
    async fn failed_synthesis_skips_the_speaking_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/llm/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("good day"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tts/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut assistant = assistant(&server);
        let turn = assistant.submit_text("hello").await;

        assert!(turn.speech.is_none());
        assert_eq!(assistant.session().mode(), SpeakingMode::Idle);
        assert_eq!(assistant.status(), AssistantStatus::HoldToTalk);
    }

    #[tokio::test]
    async fn failed_chat_still_produces_an_error_bubble() {
        let server = MockServer::start().await;

        let mut assistant = assistant(&server);
        let turn = assistant.submit_text("hello").await;

        assert_eq!(turn.reply, CHAT_ERROR_REPLY);
        let messages = assistant.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, CHAT_ERROR_REPLY);
    }

    #[tokio::test]
    async fn empty_transcripts_end_the_turn_quietly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stt/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let mut assistant = assistant(&server);
        assistant.set_listening(true);
        let turn = assistant.submit_recording(vec![0, 1, 2]).await;

        assert!(turn.is_none());
        assert!(assistant.log().messages().is_empty());
        assert_eq!(assistant.status(), AssistantStatus::HoldToTalk);
    }

    #[tokio::test]
    async fn transcribed_speech_flows_into_the_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stt/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("what time is it"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/llm/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("noon"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tts/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut assistant = assistant(&server);
        let turn = assistant.submit_recording(vec![0, 1, 2]).await.unwrap();

        assert_eq!(turn.reply, "noon");
        let messages = assistant.log().messages();
        assert_eq!(messages[0].text, "what time is it");
        assert_eq!(messages[0].direction, Direction::Outgoing);
    }
}
