//! Azure Cognitive Services speech engine

use super::AZURE_CLSID;
use crate::engine::{
    ComponentIdentity, ConfigurationParameter, EngineBackend, EngineCapabilities, EngineSupport,
    Parameters, SynthesisRequest, TtsEngine, VoiceDescriptor,
};
use crate::Result;
use log::debug;
use std::collections::BTreeMap;

pub const ENGINE_NAME: &str = "AzureTTS";

/// Azure neural voices over REST
pub struct AzureTtsEngine {
    support: EngineSupport,
}

impl Default for AzureTtsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureTtsEngine {
    pub fn new() -> Self {
        Self {
            support: EngineSupport::new(ENGINE_NAME),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn EngineBackend>) -> Self {
        self.support.set_backend(backend);
        self
    }
}

/// Escape text for inclusion in SSML
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap text in an SSML document for `voice_id`
///
/// Style and role go into an `mstts:express-as` element when present.
pub fn build_ssml(text: &str, voice_id: &str, style: Option<&str>, role: Option<&str>) -> String {
    let lang = voice_id
        .splitn(3, '-')
        .take(2)
        .collect::<Vec<_>>()
        .join("-");
    let lang = if lang.contains('-') { lang } else { "en-US".to_string() };

    let body = escape_xml(text);
    let style = style.filter(|s| !s.is_empty());
    let role = role.filter(|r| !r.is_empty());

    let inner = if style.is_some() || role.is_some() {
        let mut attrs = String::new();
        if let Some(style) = style {
            attrs.push_str(&format!(" style=\"{}\"", escape_xml(style)));
        }
        if let Some(role) = role {
            attrs.push_str(&format!(" role=\"{}\"", escape_xml(role)));
        }
        format!("<mstts:express-as{}>{}</mstts:express-as>", attrs, body)
    } else {
        body
    };

    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" \
         xmlns:mstts=\"http://www.w3.org/2001/mstts\" xml:lang=\"{}\">\
         <voice name=\"{}\">{}</voice></speak>",
        lang,
        escape_xml(voice_id),
        inner
    )
}

impl TtsEngine for AzureTtsEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn description(&self) -> String {
        "Azure Cognitive Services Text-to-Speech".to_string()
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            requires_authentication: true,
            supports_offline: false,
            requires_ssml: true,
        }
    }

    fn parameters(&self) -> Vec<ConfigurationParameter> {
        vec![
            ConfigurationParameter::new(
                "subscriptionKey",
                "Subscription Key",
                "Azure Cognitive Services subscription key",
            )
            .secret(),
            ConfigurationParameter::new("region", "Region", "Azure region (e.g., eastus, westus)")
                .with_pattern("[a-z0-9]+"),
        ]
    }

    fn list_voices(&self, config: &Parameters) -> Result<Vec<VoiceDescriptor>> {
        self.support.require_valid(&self.parameters(), config)?;
        let voices = self.support.backend()?.voices(ENGINE_NAME, config)?;
        Ok(self.support.adopt(voices))
    }

    fn synthesize(&self, text: &str, voice_id: &str, params: &Parameters) -> Result<Vec<u8>> {
        self.support.require_valid(&self.parameters(), params)?;
        let style = params.get("selectedStyle").map(String::as_str);
        let role = params.get("selectedRole").map(String::as_str);
        let ssml = build_ssml(text, voice_id, style, role);
        debug!("Azure synthesis for voice {} ({} bytes of SSML)", voice_id, ssml.len());

        self.support.backend()?.synthesize(&SynthesisRequest {
            engine: ENGINE_NAME.to_string(),
            voice_id: voice_id.to_string(),
            payload: ssml,
            is_ssml: true,
            parameters: params.clone(),
        })
    }

    fn component(&self) -> ComponentIdentity {
        ComponentIdentity::new(AZURE_CLSID, "Microsoft")
    }

    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        let schema = self.parameters();
        let mut attrs = voice.attributes.clone();
        attrs.insert("VoiceName".into(), voice.id.clone());
        if let Some(region) = self.support.param(&schema, config, "region") {
            attrs.insert("Region".into(), region);
        }
        if let Some(key) = self.support.param(&schema, config, "subscriptionKey") {
            attrs.insert("SubscriptionKey".into(), key);
        }
        if !voice.styles.is_empty() {
            attrs.insert("StyleList".into(), voice.styles.join(","));
        }
        if !voice.roles.is_empty() {
            attrs.insert("RoleList".into(), voice.roles.join(","));
        }
        if let Some(ref style) = voice.selected_style {
            attrs.insert("SelectedStyle".into(), style.clone());
        }
        if let Some(ref role) = voice.selected_role {
            attrs.insert("SelectedRole".into(), role.clone());
        }
        Ok(attrs)
    }

    fn initialize(&mut self) -> Result<()> {
        self.support.mark_initialized();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.support.mark_shutdown();
    }
}
