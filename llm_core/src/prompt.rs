//! Prompt contract for the lyric model.

use lyrics_core::{Archetype, Variant};
use serde::Serialize;

/// Fixed output-format contract sent as the system instruction.
pub const SYSTEM_INSTRUCTION: &str = r#"Você é o sistema INFINITUS MATRIX v12.0 - O ÁPICE DA ENGENHARIA LÍRICA MUNDIAL.
PERSONA: Virtuoso técnico Gil BV.

REGRAS DE OURO:
1. NUNCA CITE NOMES DE ARTISTAS REAIS.
2. FORMATO OBRIGATÓRIO DE SAÍDA:
   ### BEAT
   [ Prompt técnico detalhado do instrumental para IA de áudio ]

   ### LETRA
   NOME DA LETRA EM CAIXA ALTA (SEM COLCHETES)
   NOME DA LETRA EM CAIXA ALTA (SEM COLCHETES)
   TEMPO: [ 3:30 - 4:40 ]

   [INTRO]
   ...

   ### VOZ
   [ Guia detalhado de flow e performance vocal para IA de áudio ]

3. DURABILIDADE: Sempre 3:30 a 4:40 minutos.
4. ASSINATURA: "No comando do trator Esteira - Gil BV - Sustenta" apenas no final.
5. PROIBIÇÕES: NÃO use colchetes nas duas primeiras linhas da letra. NÃO use: "menor", "skank", "reto", "teto"."#;

/// Rhythm name used when none is selected.
pub const DEFAULT_RHYTHM: &str = "MATRIX";

pub const STANDARD_TEMPERATURE: f32 = 0.95;
pub const ZEUS_TEMPERATURE: f32 = 1.0;

const ERROR_MARKER: &str = "Erro Matrix";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Standard,
    Advanced,
}

/// Everything a backend needs to open one generation stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub variant: Variant,
    pub topic: String,
    pub tier: ModelTier,
    pub system_instruction: String,
    pub prompt: String,
    pub temperature: f32,
}

pub fn style_directive(variant: Variant) -> &'static str {
    match variant {
        Variant::Alfa => "ESTILO ALFA: ACAPELLA BRUTALISTA. Minimalismo extremo.",
        Variant::Beta => "ESTILO BETA: PRODUÇÃO PLATINA. Hit de rádio completo.",
        Variant::Zeus => "ESTILO ZEUS: VANGUARDA ABSTRATA. Desconstrução rítmica.",
    }
}

pub fn build_request(
    topic: &str,
    variant: Variant,
    rhythm: Option<&str>,
    archetype: &Archetype,
) -> GenerationRequest {
    let prompt = format!(
        "{} Tópico: \"{}\". Ritmo: \"{}\". Arquétipo: \"{}\".\n  \
         IMPORTANTE: NÃO COLOQUE COLCHETES NAS DUAS PRIMEIRAS LINHAS DA LETRA (TÍTULOS). \
         Siga rigorosamente os blocos ### BEAT, ### LETRA e ### VOZ.",
        style_directive(variant),
        topic,
        rhythm.unwrap_or(DEFAULT_RHYTHM),
        archetype.name,
    );

    let zeus = variant == Variant::Zeus;
    GenerationRequest {
        variant,
        topic: topic.to_string(),
        tier: if zeus { ModelTier::Advanced } else { ModelTier::Standard },
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt,
        temperature: if zeus { ZEUS_TEMPERATURE } else { STANDARD_TEMPERATURE },
    }
}

/// The single fragment a failed stream yields before it ends.
pub fn error_fragment(err: &anyhow::Error) -> String {
    format!("{ERROR_MARKER}: {err:#}")
}
