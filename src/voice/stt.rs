//! Speech-to-text (STT) processing

use async_trait::async_trait;

use super::Transcriber;
use crate::{Error, Result};

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from the Azure short-audio recognition API
#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AzureResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: String,
}

/// STT provider backend
#[derive(Clone, Debug)]
enum SttProvider {
    Whisper { model: String },
    Azure { region: String, language: String },
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::CriticalInit(
                "OPENAI_API_KEY required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            provider: SttProvider::Whisper { model },
        })
    }

    /// Create a new STT instance using Azure Speech
    ///
    /// # Errors
    ///
    /// Returns error if the key or region is missing
    pub fn new_azure(api_key: String, region: String, language: String) -> Result<Self> {
        if api_key.is_empty() || region.is_empty() {
            return Err(Error::CriticalInit(
                "AZURE_TTS_KEY and AZURE_TTS_REGION required for Azure Speech".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            provider: SttProvider::Azure { region, language },
        })
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8], model: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", model.to_string());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("Whisper request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Transcription(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("unreadable Whisper response: {e}")))?;

        Ok(result.text)
    }

    /// Transcribe using Azure short-audio recognition
    async fn transcribe_azure(&self, audio: &[u8], region: &str, language: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), region, "starting Azure transcription");

        let url = format!(
            "https://{region}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1?language={language}&format=simple"
        );

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header(
                "Content-Type",
                "audio/wav; codecs=audio/pcm; samplerate=16000",
            )
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("Azure request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Azure Speech API error");
            return Err(Error::Transcription(format!(
                "Azure Speech API error {status}: {body}"
            )));
        }

        let result: AzureResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("unreadable Azure response: {e}")))?;

        interpret_azure(result)
    }
}

/// Map an Azure recognition status to text; silence and no-match yield ""
fn interpret_azure(result: AzureResponse) -> Result<String> {
    match result.recognition_status.as_str() {
        "Success" => Ok(result.display_text),
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => {
            tracing::info!(status = %result.recognition_status, "no speech recognized");
            Ok(String::new())
        }
        other => Err(Error::Transcription(format!(
            "Azure recognition failed: {other}"
        ))),
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        let text = match &self.provider {
            SttProvider::Whisper { model } => self.transcribe_whisper(wav, model).await?,
            SttProvider::Azure { region, language } => {
                self.transcribe_azure(wav, region, language).await?
            }
        };

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure(status: &str, text: &str) -> AzureResponse {
        serde_json::from_value(serde_json::json!({
            "RecognitionStatus": status,
            "DisplayText": text,
        }))
        .unwrap()
    }

    #[test]
    fn azure_success_returns_display_text() {
        assert_eq!(interpret_azure(azure("Success", "Hello chat.")).unwrap(), "Hello chat.");
    }

    #[test]
    fn azure_silence_is_empty_not_error() {
        assert_eq!(interpret_azure(azure("NoMatch", "")).unwrap(), "");
        assert_eq!(interpret_azure(azure("InitialSilenceTimeout", "")).unwrap(), "");
    }

    #[test]
    fn azure_error_status_is_transcription_error() {
        let err = interpret_azure(azure("Error", "")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Transcription);
    }

    #[test]
    fn missing_credentials_are_critical() {
        assert!(SpeechToText::new_whisper(String::new(), "whisper-1".to_string()).is_err());
        assert!(
            SpeechToText::new_azure("key".to_string(), String::new(), "en-US".to_string())
                .is_err()
        );
    }
}
