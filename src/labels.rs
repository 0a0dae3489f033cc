use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of diagnostic categories the model distinguishes.
pub const CLASS_COUNT: usize = 7;

/// The seven HAM10000 diagnostic categories, declared in the exact order of
/// the model's output vector. Serde uses the short lowercase codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Akiec,
    Bcc,
    Bkl,
    Df,
    Mel,
    Nv,
    Vasc,
}

impl ClassLabel {
    /// All labels in model output order.
    pub const ALL: [ClassLabel; CLASS_COUNT] = [
        ClassLabel::Akiec,
        ClassLabel::Bcc,
        ClassLabel::Bkl,
        ClassLabel::Df,
        ClassLabel::Mel,
        ClassLabel::Nv,
        ClassLabel::Vasc,
    ];

    pub fn from_index(index: usize) -> Option<ClassLabel> {
        Self::ALL.get(index).copied()
    }

    pub fn code(self) -> &'static str {
        match self {
            ClassLabel::Akiec => "akiec",
            ClassLabel::Bcc => "bcc",
            ClassLabel::Bkl => "bkl",
            ClassLabel::Df => "df",
            ClassLabel::Mel => "mel",
            ClassLabel::Nv => "nv",
            ClassLabel::Vasc => "vasc",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEntry {
    pub full_name: String,
    /// Trusted HTML fragment rendered verbatim on the result page.
    pub recommendation: String,
}

#[derive(Debug, Error)]
pub enum LabelTableError {
    #[error("failed to read label table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse label table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Label → (full name, recommendation) lookup. Built once at startup, either
/// from the compiled-in defaults or from a JSON file, and never mutated.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelTable {
    #[serde(default = "default_recommendation_text")]
    default_recommendation: String,
    #[serde(default)]
    classes: HashMap<ClassLabel, LabelEntry>,
}

impl LabelTable {
    /// The compiled-in table covering all seven labels.
    pub fn builtin() -> LabelTable {
        let mut classes = HashMap::with_capacity(CLASS_COUNT);
        for label in ClassLabel::ALL {
            classes.insert(
                label,
                LabelEntry {
                    full_name: builtin_full_name(label).to_string(),
                    recommendation: builtin_recommendation(label).to_string(),
                },
            );
        }
        LabelTable {
            default_recommendation: default_recommendation_text(),
            classes,
        }
    }

    /// Loads an operator-supplied table so medical content can change
    /// without recompiling. Labels absent from the file fall back to the
    /// default recommendation at lookup time.
    pub fn from_path(path: &Path) -> Result<LabelTable, LabelTableError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn full_name(&self, label: ClassLabel) -> &str {
        self.classes
            .get(&label)
            .map(|entry| entry.full_name.as_str())
            .unwrap_or("Unknown")
    }

    pub fn recommendation(&self, label: ClassLabel) -> &str {
        self.classes
            .get(&label)
            .map(|entry| entry.recommendation.as_str())
            .unwrap_or(&self.default_recommendation)
    }

    pub fn default_recommendation(&self) -> &str {
        &self.default_recommendation
    }
}

fn default_recommendation_text() -> String {
    "No recommendation is available. Please consult a dermatologist for \
     further information."
        .to_string()
}

fn builtin_full_name(label: ClassLabel) -> &'static str {
    match label {
        ClassLabel::Akiec => "Actinic keratoses",
        ClassLabel::Bcc => "Basal cell carcinoma",
        ClassLabel::Bkl => "Benign keratosis-like lesions",
        ClassLabel::Df => "Dermatofibroma",
        ClassLabel::Mel => "Melanoma",
        ClassLabel::Nv => "Melanocytic nevi",
        ClassLabel::Vasc => "Vascular lesions",
    }
}

fn builtin_recommendation(label: ClassLabel) -> &'static str {
    match label {
        ClassLabel::Akiec => {
            "<strong>Status:</strong> Pre-cancerous (actinic keratosis).\
             <br><strong>Prevention:</strong> Caused by sun damage. Strict UV \
             protection (sunscreen, hats, protective clothing) is essential.\
             <br><strong>Management:</strong> <strong>Important to have this \
             examined by a doctor.</strong> These lesions can progress to skin \
             cancer. Treatment may include cryotherapy, prescription creams, or \
             other therapies."
        }
        ClassLabel::Bcc => {
            "<strong>Status:</strong> Skin cancer (basal cell carcinoma).\
             <br><strong>Prevention:</strong> Strict UV protection is key. Use \
             sunscreen and avoid excessive sun exposure.\
             <br><strong>Management:</strong> <strong>See a doctor promptly.\
             </strong> BCC usually grows slowly and is highly curable when \
             treated early, often with minor surgery or topical treatment."
        }
        ClassLabel::Bkl => {
            "<strong>Status:</strong> Benign (such as seborrheic keratosis).\
             <br><strong>Prevention:</strong> Not fully preventable; often \
             related to genetics and ageing.\
             <br><strong>Management:</strong> Usually needs no medical \
             treatment. If the lesion itches, becomes irritated, or is \
             cosmetically bothersome, a doctor can remove it with a simple \
             procedure."
        }
        ClassLabel::Df => {
            "<strong>Status:</strong> Benign (dermatofibroma).\
             <br><strong>Prevention:</strong> Not preventable. Often appears \
             after minor skin injury such as an insect bite.\
             <br><strong>Management:</strong> Harmless and needs no treatment. \
             The lesion typically feels firm to the touch. <strong>Consult a \
             doctor</strong> only to confirm the diagnosis."
        }
        ClassLabel::Mel => {
            "<strong>Status:</strong> Potentially serious (melanoma skin \
             cancer).\
             <br><strong>Prevention:</strong> Use sunscreen daily (SPF 30+), \
             avoid peak sun hours (10am to 4pm), and wear protective clothing.\
             <br><strong>Management:</strong> <strong>It is VERY IMPORTANT to \
             consult a dermatologist immediately.</strong> Early detection is \
             the key to successful treatment. Do not delay an examination."
        }
        ClassLabel::Nv => {
            "<strong>Status:</strong> Generally benign (a common mole).\
             <br><strong>Prevention:</strong> Perform regular skin self-checks \
             (the ABCDE method - Asymmetry, Border, Color, Diameter, \
             Evolving). Protect your skin from excessive UV exposure.\
             <br><strong>Management:</strong> Usually harmless. However, if you \
             notice changes in shape, size, or color, or it itches or bleeds, \
             <strong>see a doctor promptly</strong> to rule out melanoma."
        }
        ClassLabel::Vasc => {
            "<strong>Status:</strong> Generally benign (a vascular lesion such \
             as an angioma).\
             <br><strong>Prevention:</strong> Usually not preventable; often \
             congenital or developing with age.\
             <br><strong>Management:</strong> Usually harmless and needs no \
             treatment. If it bleeds easily or is cosmetically bothersome, a \
             doctor can treat it, for example with a laser."
        }
    }
}
