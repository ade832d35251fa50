use crate::error::ValidationError;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub type OfficerId = u32;

/// Decision recorded by one approving authority for one officer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Approval {
    #[default]
    Unset,
    Approved,
    Rejected,
    Pending,
}

impl Approval {
    pub fn as_str(self) -> &'static str {
        match self {
            Approval::Unset => "",
            Approval::Approved => "approved",
            Approval::Rejected => "rejected",
            Approval::Pending => "pending",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Approval::Unset => "-",
            Approval::Approved => "✓",
            Approval::Rejected => "✗",
            Approval::Pending => "⏳",
        }
    }
}

impl FromStr for Approval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unset" | "-" => Ok(Approval::Unset),
            "approved" => Ok(Approval::Approved),
            "rejected" => Ok(Approval::Rejected),
            "pending" => Ok(Approval::Pending),
            _ => Err(ValidationError::InvalidApproval(s.to_string())),
        }
    }
}

impl Serialize for Approval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// The backend stores an unset approval either as "" or null. A value outside
// the vocabulary is read as unset so one bad row cannot hide a whole list.
impl<'de> Deserialize<'de> for Approval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Approval::Unset),
            Some(value) => Ok(value.parse().unwrap_or_else(|_| {
                warn!(approval = %value, "unknown approval value read as unset");
                Approval::Unset
            })),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApprovalAuthority {
    ColMs3,
    BrigB,
    AddlMsA,
    BrigMsC,
    AddlMsB,
}

impl ApprovalAuthority {
    pub const ALL: [ApprovalAuthority; 5] = [
        ApprovalAuthority::ColMs3,
        ApprovalAuthority::BrigB,
        ApprovalAuthority::AddlMsA,
        ApprovalAuthority::BrigMsC,
        ApprovalAuthority::AddlMsB,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ApprovalAuthority::ColMs3 => "Col MS 3",
            ApprovalAuthority::BrigB => "Brig B",
            ApprovalAuthority::AddlMsA => "Addl MS(A)",
            ApprovalAuthority::BrigMsC => "Brig MS(C)",
            ApprovalAuthority::AddlMsB => "Addl MS(B)",
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            ApprovalAuthority::ColMs3 => "colMS3Approval",
            ApprovalAuthority::BrigB => "brigBApproval",
            ApprovalAuthority::AddlMsA => "addlMSAApproval",
            ApprovalAuthority::BrigMsC => "brigMSCApproval",
            ApprovalAuthority::AddlMsB => "addlMSBApproval",
        }
    }
}

/// A single editable column of an officer row, addressed by its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficerField {
    IcNo,
    Name,
    Deputation,
    Approval(ApprovalAuthority),
}

impl OfficerField {
    pub fn name(self) -> &'static str {
        match self {
            OfficerField::IcNo => "icNo",
            OfficerField::Name => "name",
            OfficerField::Deputation => "deputation",
            OfficerField::Approval(authority) => authority.field_name(),
        }
    }
}

impl FromStr for OfficerField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        match wanted.to_ascii_lowercase().as_str() {
            "icno" | "ic-no" | "ic_no" => return Ok(OfficerField::IcNo),
            "name" => return Ok(OfficerField::Name),
            "deputation" | "department" => return Ok(OfficerField::Deputation),
            _ => {}
        }
        ApprovalAuthority::ALL
            .into_iter()
            .find(|authority| authority.field_name().eq_ignore_ascii_case(wanted))
            .map(OfficerField::Approval)
            .ok_or_else(|| ValidationError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for OfficerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Officer {
    pub id: OfficerId,
    #[serde(default)]
    pub ic_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "department")]
    pub deputation: String,
    #[serde(default, rename = "colMS3Approval")]
    pub col_ms3_approval: Approval,
    #[serde(default, rename = "brigBApproval")]
    pub brig_b_approval: Approval,
    #[serde(default, rename = "addlMSAApproval")]
    pub addl_ms_a_approval: Approval,
    #[serde(default, rename = "brigMSCApproval")]
    pub brig_ms_c_approval: Approval,
    #[serde(default, rename = "addlMSBApproval")]
    pub addl_ms_b_approval: Approval,
}

impl Officer {
    pub fn blank(id: OfficerId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn approval(&self, authority: ApprovalAuthority) -> Approval {
        match authority {
            ApprovalAuthority::ColMs3 => self.col_ms3_approval,
            ApprovalAuthority::BrigB => self.brig_b_approval,
            ApprovalAuthority::AddlMsA => self.addl_ms_a_approval,
            ApprovalAuthority::BrigMsC => self.brig_ms_c_approval,
            ApprovalAuthority::AddlMsB => self.addl_ms_b_approval,
        }
    }

    fn approval_mut(&mut self, authority: ApprovalAuthority) -> &mut Approval {
        match authority {
            ApprovalAuthority::ColMs3 => &mut self.col_ms3_approval,
            ApprovalAuthority::BrigB => &mut self.brig_b_approval,
            ApprovalAuthority::AddlMsA => &mut self.addl_ms_a_approval,
            ApprovalAuthority::BrigMsC => &mut self.brig_ms_c_approval,
            ApprovalAuthority::AddlMsB => &mut self.addl_ms_b_approval,
        }
    }

    /// Replaces one field. Approval columns only accept the approval
    /// vocabulary; text columns take the value verbatim.
    pub fn set(&mut self, field: OfficerField, value: &str) -> Result<(), ValidationError> {
        match field {
            OfficerField::IcNo => self.ic_no = value.to_string(),
            OfficerField::Name => self.name = value.to_string(),
            OfficerField::Deputation => self.deputation = value.to_string(),
            OfficerField::Approval(authority) => *self.approval_mut(authority) = value.parse()?,
        }
        Ok(())
    }
}
