//! Spec invariant checks
//!
//! Pure functions shared by admission (reject the request) and reconciliation
//! (annotate a condition). Every rule is evaluated independently and all
//! violations are returned, not just the first.

use crate::network::{NetworkSpec, NetworkType};
use crate::references::{NETWORK_API_GROUP, VSPHERE_DISTRIBUTED_NETWORK_KIND};
use crate::vsphere_distributed_network::{
    IPAssignmentMode, VSphereDistributedNetworkSpec, VlanSpec, VlanType,
};
use thiserror::Error;

/// Lowest VLAN ID accepted anywhere in a VlanSpec
pub const VLAN_ID_MIN: i32 = 0;

/// Highest VLAN ID accepted anywhere in a VlanSpec
pub const VLAN_ID_MAX: i32 = 4094;

/// Category of a field-level violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A required value is missing
    Required,
    /// A value is set that must be empty
    Forbidden,
    /// A value is outside the supported enum
    NotSupported,
    /// A numeric value is outside its range
    OutOfRange,
    /// Any other inconsistency
    Invalid,
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {detail}")]
pub struct FieldError {
    /// JSON path of the offending field (e.g., `spec.ipPools`)
    pub path: String,
    /// Category of the failure
    pub kind: FieldErrorKind,
    /// Human-readable explanation
    pub detail: String,
}

impl FieldError {
    fn new(path: impl Into<String>, kind: FieldErrorKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// All field errors for one object, used to reject at admission time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s): {}", .0.len(), join_field_errors(.0))]
pub struct ValidationError(pub Vec<FieldError>);

impl ValidationError {
    fn from_errors(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() { Ok(()) } else { Err(Self(errors)) }
    }
}

/// Render field errors as a single `; `-separated line
pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check that ipPools/gateway/subnetMask agree with the IP assignment mode
pub fn validate_spec(spec: &VSphereDistributedNetworkSpec) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match spec.effective_ip_assignment_mode() {
        IPAssignmentMode::StaticPool => {
            if spec.ip_pools.is_empty() {
                errors.push(FieldError::new(
                    "spec.ipPools",
                    FieldErrorKind::Required,
                    "at least one IP pool is required when ipAssignmentMode is staticpool",
                ));
            }
            if spec.gateway.is_empty() {
                errors.push(FieldError::new(
                    "spec.gateway",
                    FieldErrorKind::Required,
                    "gateway is required when ipAssignmentMode is staticpool",
                ));
            }
            if spec.subnet_mask.is_empty() {
                errors.push(FieldError::new(
                    "spec.subnetMask",
                    FieldErrorKind::Required,
                    "subnetMask is required when ipAssignmentMode is staticpool",
                ));
            }
        }
        mode @ (IPAssignmentMode::Dhcp | IPAssignmentMode::None) => {
            if !spec.ip_pools.is_empty() {
                errors.push(FieldError::new(
                    "spec.ipPools",
                    FieldErrorKind::Forbidden,
                    format!("ipPools must be empty when ipAssignmentMode is {mode}"),
                ));
            }
            if !spec.gateway.is_empty() {
                errors.push(FieldError::new(
                    "spec.gateway",
                    FieldErrorKind::Forbidden,
                    format!("gateway must be empty when ipAssignmentMode is {mode}"),
                ));
            }
            if !spec.subnet_mask.is_empty() {
                errors.push(FieldError::new(
                    "spec.subnetMask",
                    FieldErrorKind::Forbidden,
                    format!("subnetMask must be empty when ipAssignmentMode is {mode}"),
                ));
            }
        }
        IPAssignmentMode::Unrecognized(value) => {
            errors.push(FieldError::new(
                "spec.ipAssignmentMode",
                FieldErrorKind::NotSupported,
                format!("unsupported value {value:?}: supported values are dhcp, staticpool, none"),
            ));
        }
    }

    errors
}

/// Check the fields of the active VLAN type. Inactive fields are ignored.
pub fn validate_vlan(vlan: &VlanSpec) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match vlan.type_ {
        VlanType::Standard => {
            if let Some(id) = vlan.vlan_id {
                check_vlan_id(&mut errors, "vlan.vlanID", id);
            }
        }
        VlanType::Trunk => {
            for (i, range) in vlan.trunk_range.iter().enumerate() {
                check_vlan_id(&mut errors, &format!("vlan.trunkRange[{i}].start"), range.start);
                check_vlan_id(&mut errors, &format!("vlan.trunkRange[{i}].end"), range.end);
                if range.start > range.end {
                    errors.push(FieldError::new(
                        format!("vlan.trunkRange[{i}]"),
                        FieldErrorKind::Invalid,
                        format!("start {} is greater than end {}", range.start, range.end),
                    ));
                }
            }
        }
        VlanType::Private => {
            if let Some(id) = vlan.private_vlan_id {
                check_vlan_id(&mut errors, "vlan.privateVlanID", id);
            }
        }
    }

    errors
}

fn check_vlan_id(errors: &mut Vec<FieldError>, path: &str, id: i32) {
    if !(VLAN_ID_MIN..=VLAN_ID_MAX).contains(&id) {
        errors.push(FieldError::new(
            path,
            FieldErrorKind::OutOfRange,
            format!("{id} is outside {VLAN_ID_MIN}-{VLAN_ID_MAX}"),
        ));
    }
}

/// Advisory notes for fields populated on an inactive VLAN type.
///
/// These are never errors; the values are ignored.
pub fn vlan_warnings(vlan: &VlanSpec) -> Vec<String> {
    let mut warnings = Vec::new();
    let ty = vlan.type_;

    if ty != VlanType::Standard && vlan.vlan_id.is_some() {
        warnings.push(format!("vlan.vlanID is ignored for {ty} VLANs"));
    }
    if ty != VlanType::Trunk && !vlan.trunk_range.is_empty() {
        warnings.push(format!("vlan.trunkRange is ignored for {ty} VLANs"));
    }
    if ty != VlanType::Private && vlan.private_vlan_id.is_some() {
        warnings.push(format!("vlan.privateVlanID is ignored for {ty} VLANs"));
    }

    warnings
}

/// Check a Network spec on its own
pub fn validate_network_spec(spec: &NetworkSpec) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let provider = &spec.provider_ref;

    if provider.kind.is_empty() {
        errors.push(FieldError::new(
            "spec.providerRef.kind",
            FieldErrorKind::Required,
            "provider kind is required",
        ));
    }
    if provider.name.is_empty() {
        errors.push(FieldError::new(
            "spec.providerRef.name",
            FieldErrorKind::Required,
            "provider name is required",
        ));
    }

    if spec.type_ == NetworkType::VSphereDistributed
        && !provider.kind.is_empty()
        && (provider.kind != VSPHERE_DISTRIBUTED_NETWORK_KIND || provider.api_group != NETWORK_API_GROUP)
    {
        errors.push(FieldError::new(
            "spec.providerRef",
            FieldErrorKind::Invalid,
            format!(
                "network type {} requires a {VSPHERE_DISTRIBUTED_NETWORK_KIND}.{NETWORK_API_GROUP} provider, got {}.{}",
                spec.type_, provider.kind, provider.api_group
            ),
        ));
    }

    errors
}

/// Check an update against the previous spec. `providerRef` is immutable.
pub fn validate_network_update(old: &NetworkSpec, new: &NetworkSpec) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !old.provider_ref.same_target(&new.provider_ref) {
        errors.push(FieldError::new(
            "spec.providerRef",
            FieldErrorKind::Forbidden,
            format!("field is immutable (was {})", old.provider_ref),
        ));
    }
    errors
}

/// Admission check for a Network create (`old = None`) or update
pub fn admit_network(old: Option<&NetworkSpec>, new: &NetworkSpec) -> Result<(), ValidationError> {
    let mut errors = validate_network_spec(new);
    if let Some(old) = old {
        errors.extend(validate_network_update(old, new));
    }
    ValidationError::from_errors(errors)
}

/// Admission check for a VSphereDistributedNetwork create or update
pub fn admit_vsphere_distributed_network(
    spec: &VSphereDistributedNetworkSpec,
) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    if spec.port_group_id.is_empty() {
        errors.push(FieldError::new(
            "spec.portGroupID",
            FieldErrorKind::Required,
            "portGroupID is required",
        ));
    }
    errors.extend(validate_spec(spec));
    ValidationError::from_errors(errors)
}
