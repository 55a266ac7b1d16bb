use crate::error::{RiskError, RiskResult};

pub trait Categorical: Copy + PartialEq + Sized + 'static {
    /// Feature column this encoding belongs to.
    const FEATURE: &'static str;

    /// Display label to variant, in code order.
    const TABLE: &'static [(&'static str, Self)];

    fn code(self) -> u8;

    fn label(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, variant)| *variant == self)
            .map(|(label, _)| *label)
            .unwrap_or("")
    }

    fn from_code(code: u8) -> Option<Self> {
        Self::TABLE
            .iter()
            .map(|(_, variant)| *variant)
            .find(|variant| variant.code() == code)
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label.trim()))
            .map(|(_, variant)| *variant)
    }

    /// Decode a raw numeric feature value. Only exact integral codes are accepted.
    fn from_value(value: f64) -> RiskResult<Self> {
        let allowed = || {
            Self::TABLE
                .iter()
                .map(|(_, v)| v.code().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        if value.fract() != 0.0 || !(0.0..=255.0).contains(&value) {
            return Err(RiskError::Validation(format!(
                "{} must be one of [{}], got {}",
                Self::FEATURE,
                allowed(),
                value
            )));
        }
        Self::from_code(value as u8).ok_or_else(|| {
            RiskError::Validation(format!(
                "{} must be one of [{}], got {}",
                Self::FEATURE,
                allowed(),
                value
            ))
        })
    }

    /// Parse a command-line value given either as a label or a numeric code.
    fn parse(input: &str) -> Result<Self, String> {
        if let Some(variant) = Self::from_label(input) {
            return Ok(variant);
        }
        if let Ok(code) = input.trim().parse::<u8>() {
            if let Some(variant) = Self::from_code(code) {
                return Ok(variant);
            }
        }
        let choices: Vec<String> = Self::TABLE
            .iter()
            .map(|(label, v)| format!("{} ({})", label, v.code()))
            .collect();
        Err(format!(
            "invalid {} `{}`; expected one of: {}",
            Self::FEATURE,
            input,
            choices.join(", ")
        ))
    }
}

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident, $feature:literal {
            $($variant:ident = $code:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Categorical for $name {
            const FEATURE: &'static str = $feature;
            const TABLE: &'static [(&'static str, Self)] = &[$(($label, $name::$variant)),+];

            fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }
    };
}

categorical! {
    /// Biological sex (`sex`).
    Sex, "sex" {
        Female = 0 => "Female",
        Male = 1 => "Male",
    }
}

categorical! {
    /// Chest pain type (`cp`).
    ChestPain, "cp" {
        TypicalAngina = 0 => "Typical angina",
        AtypicalAngina = 1 => "Atypical angina",
        NonAnginal = 2 => "Non-anginal pain",
        Asymptomatic = 3 => "Asymptomatic",
    }
}

categorical! {
    /// Yes/No flags (`fbs` fasting blood sugar > 120 mg/dl, `exang` exercise angina).
    Flag, "flag" {
        No = 0 => "No",
        Yes = 1 => "Yes",
    }
}

categorical! {
    /// Resting electrocardiogram result (`restecg`).
    RestingEcg, "restecg" {
        Normal = 0 => "Normal",
        StTAbnormality = 1 => "ST-T abnormality",
        LvHypertrophy = 2 => "LV hypertrophy",
    }
}

categorical! {
    /// Slope of the peak exercise ST segment (`slope`).
    StSlope, "slope" {
        Upsloping = 0 => "Upsloping",
        Flat = 1 => "Flat",
        Downsloping = 2 => "Downsloping",
    }
}

categorical! {
    /// Thalassemia code (`thal`).
    Thal, "thal" {
        Unknown = 0 => "Unknown",
        FixedDefect = 1 => "Fixed defect",
        Normal = 2 => "Normal",
        ReversibleDefect = 3 => "Reversible defect",
    }
}
