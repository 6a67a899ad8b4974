//! Prompt template for the audit narrative

use crate::models::{DesignParameters, PARAMETER_SPECS};
use serde::Deserialize;

/// Language of the prompt, and therefore of the generated report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptLanguage {
    #[default]
    Es,
    En,
}

/// Values embedded in the prompt
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput<'a> {
    pub parameters: &'a DesignParameters,
    pub ad_ratio: f64,
    pub predicted_load_kn: f64,
}

/// Render the fixed audit prompt
pub fn build_prompt(input: &NarrativeInput<'_>, language: PromptLanguage) -> String {
    let p = input.parameters;
    let fc = PARAMETER_SPECS[0].format(p.fc);
    let b = PARAMETER_SPECS[1].format(p.b);
    let d = PARAMETER_SPECS[2].format(p.d);
    let a = PARAMETER_SPECS[3].format(p.a);
    let rho_pct = p.rho * 100.0;
    let ratio = input.ad_ratio;
    let pu = input.predicted_load_kn;

    match language {
        PromptLanguage::Es => format!(
            "Eres un ingeniero especialista en diseño estructural.\n\
             Debes auditar el siguiente elemento estructural:\n\
             - Resistencia del Concreto (f'c): {fc} MPa\n\
             - Geometría: Ancho={b}mm, Peralte efectivo={d}mm, Brazo={a}mm\n\
             - Relación a/d: {ratio:.2}\n\
             - Cuantía de refuerzo (ρ): {rho_pct:.2}%\n\
             - Capacidad de Carga Predicha por IA (Pu): {pu:.2} kN\n\
             \n\
             INSTRUCCIONES:\n\
             1. Verifica la relación a/d y clasifica si es una ménsula corta.\n\
             2. Evalúa si la carga de {pu:.2} kN es coherente para estas dimensiones.\n\
             3. Redacta una recomendación de seguridad o refuerzo citando criterios del ACI 318.\n\
             \n\
             Formato: 3 párrafos técnicos pero claros, no los elabores como una nota, \
             manéjalos como conclusiones del análisis realizado.\n"
        ),
        PromptLanguage::En => format!(
            "You are a structural design specialist engineer.\n\
             Audit the following structural element:\n\
             - Concrete strength (f'c): {fc} MPa\n\
             - Geometry: width={b}mm, effective depth={d}mm, lever arm={a}mm\n\
             - a/d ratio: {ratio:.2}\n\
             - Reinforcement ratio (ρ): {rho_pct:.2}%\n\
             - AI-predicted load capacity (Pu): {pu:.2} kN\n\
             \n\
             INSTRUCTIONS:\n\
             1. Check the a/d ratio and state whether the element is a short corbel.\n\
             2. Assess whether a load of {pu:.2} kN is coherent for these dimensions.\n\
             3. Write a safety or reinforcement recommendation citing ACI 318 criteria.\n\
             \n\
             Format: 3 technical but clear paragraphs, written as conclusions of the \
             analysis rather than as a note.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(params: &DesignParameters) -> NarrativeInput<'_> {
        NarrativeInput {
            parameters: params,
            ad_ratio: params.a / params.d,
            predicted_load_kn: 812.3456,
        }
    }

    #[test]
    fn test_spanish_prompt_embeds_values() {
        let params = DesignParameters::default();
        let prompt = build_prompt(&input(&params), PromptLanguage::Es);

        assert!(prompt.contains("f'c): 28 MPa"));
        assert!(prompt.contains("Ancho=300mm, Peralte efectivo=500mm, Brazo=250mm"));
        assert!(prompt.contains("Relación a/d: 0.50"));
        assert!(prompt.contains("(ρ): 1.00%"));
        assert!(prompt.contains("(Pu): 812.35 kN"));
        assert!(prompt.contains("ACI 318"));
        assert!(prompt.contains("3 párrafos"));
    }

    #[test]
    fn test_english_prompt_embeds_values() {
        let params = DesignParameters {
            a: 500.0,
            d: 300.0,
            rho: 0.0045,
            ..DesignParameters::default()
        };
        let prompt = build_prompt(&input(&params), PromptLanguage::En);

        assert!(prompt.contains("a/d ratio: 1.67"));
        assert!(prompt.contains("(ρ): 0.45%"));
        assert!(prompt.contains("load of 812.35 kN"));
        assert!(prompt.contains("ACI 318"));
    }

    #[test]
    fn test_default_language_is_spanish() {
        assert_eq!(PromptLanguage::default(), PromptLanguage::Es);
    }
}
