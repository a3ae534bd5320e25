use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::BitOr;

pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const CATEGORY_BROWSABLE: &str = "android.intent.category.BROWSABLE";

/// Launch flags understood by the activity launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntentFlags(u32);

impl IntentFlags {
    pub const NONE: Self = Self(0);
    pub const CLEAR_TASK: Self = Self(0x0000_8000);
    pub const REORDER_TO_FRONT: Self = Self(0x0002_0000);
    pub const RESET_TASK_IF_NEEDED: Self = Self(0x0020_0000);
    pub const NEW_TASK: Self = Self(0x1000_0000);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for IntentFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Typed intent extra.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ExtraValue {
    /// Arrays, objects and nulls have no extra representation.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Description of an activity launch or broadcast.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaunchIntent {
    pub package: Option<String>,
    pub action: Option<String>,
    pub data: Option<String>,
    pub categories: Vec<String>,
    pub extras: BTreeMap<String, ExtraValue>,
    pub flags: IntentFlags,
}

impl LaunchIntent {
    pub fn for_package(package: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            ..Self::default()
        }
    }

    pub fn with_action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    pub fn view(url: impl Into<String>) -> Self {
        Self {
            action: Some(ACTION_VIEW.into()),
            data: Some(url.into()),
            categories: vec![CATEGORY_BROWSABLE.into()],
            ..Self::default()
        }
    }

    pub fn add_flags(&mut self, flags: IntentFlags) {
        self.flags = self.flags | flags;
    }

    /// Copy every representable entry of `extras`. Returns the keys skipped.
    pub fn put_extras(&mut self, extras: &Map<String, Value>) -> Vec<String> {
        let mut skipped = Vec::new();
        for (key, value) in extras {
            match ExtraValue::from_json(value) {
                Some(extra) => {
                    self.extras.insert(key.clone(), extra);
                }
                None => skipped.push(key.clone()),
            }
        }
        skipped
    }
}
