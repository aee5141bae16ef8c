//! 合规判定结果 (Compliance verdict)

use std::fmt;

use serde::{Deserialize, Serialize};

/// 需要检查的装备 (封闭词表)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentItem {
    Helmet,
    Vest,
    Boots,
    Goggles,
}

impl EquipmentItem {
    pub fn label(self) -> &'static str {
        match self {
            Self::Helmet => "Helmet",
            Self::Vest => "Vest",
            Self::Boots => "Boots",
            Self::Goggles => "Goggles",
        }
    }
}

impl fmt::Display for EquipmentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 明确违规 (比单纯缺失更强的信号)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Violation {
    /// 安全帽拿在手里而不是戴在头上
    CarryingHelmet,
}

impl Violation {
    pub fn label(self) -> &'static str {
        match self {
            Self::CarryingHelmet => "Carrying Helmet",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 单人单帧的判定结果, 标签按插入顺序 (Helmet, Vest, Boots, Goggles)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    missing: Vec<EquipmentItem>,
    violations: Vec<Violation>,
}

impl ComplianceVerdict {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_missing(&mut self, item: EquipmentItem) {
        if !self.missing.contains(&item) {
            self.missing.push(item);
        }
    }

    pub(crate) fn add_violation(&mut self, violation: Violation) {
        if !self.violations.contains(&violation) {
            self.violations.push(violation);
        }
    }

    pub fn missing(&self) -> &[EquipmentItem] {
        &self.missing
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty() && self.violations.is_empty()
    }

    pub fn missing_labels(&self) -> Vec<&'static str> {
        self.missing.iter().map(|m| m.label()).collect()
    }

    pub fn violation_labels(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.label()).collect()
    }

    /// 事件标签: 先缺失装备,后明确违规
    pub fn labels(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|m| m.label())
            .chain(self.violations.iter().map(|v| v.label()))
            .map(str::to_string)
            .collect()
    }
}
