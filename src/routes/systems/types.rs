use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::entity::systems;
use crate::error::{AppError, AppResult};
use crate::routes::params::{
    non_blank, nullable, nullable_instant, optional_instant, require_max_len, require_non_negative,
    require_not_blank, require_range, require_timezone, INVERTER_MODEL_MAX_LEN,
    LOCATION_NAME_MAX_LEN, NAME_MAX_LEN, SYSTEM_ID_MAX_LEN, TIMEZONE_MAX_LEN,
};

/// Register a new installation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSystemRequest {
    /// Stable identifier, immutable once created (e.g. `PV-001`)
    pub system_id: String,
    pub name: String,
    /// Installed capacity in kW
    pub capacity: Option<f64>,
    pub panel_count: Option<i32>,
    /// Per-panel rating in W
    pub panel_wattage: Option<f64>,
    pub inverter_model: Option<String>,
    /// Free-text site description
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// IANA zone; resolved from coordinates when omitted
    pub timezone: Option<String>,
    /// Human-readable place; reverse-geocoded when omitted
    pub location_name: Option<String>,
    pub tilt_angle: Option<f64>,
    pub azimuth: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "optional_instant")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub installation_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub extra_metadata: Option<Map<String, Value>>,
}

fn default_active() -> bool {
    true
}

impl CreateSystemRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_not_blank("system_id", &self.system_id)?;
        require_max_len("system_id", Some(self.system_id.trim()), SYSTEM_ID_MAX_LEN)?;
        require_not_blank("name", &self.name)?;
        validate_text(
            Some(self.name.as_str()),
            self.inverter_model.as_deref(),
            self.timezone.as_deref(),
            self.location_name.as_deref(),
        )?;
        validate_specs(
            self.capacity,
            self.panel_count,
            self.panel_wattage,
            self.tilt_angle,
            self.azimuth,
        )?;
        require_range("latitude", self.latitude, -90.0, 90.0)?;
        require_range("longitude", self.longitude, -180.0, 180.0)?;
        require_timezone("timezone", self.timezone.as_deref())?;
        Ok(())
    }
}

fn validate_text(
    name: Option<&str>,
    inverter_model: Option<&str>,
    timezone: Option<&str>,
    location_name: Option<&str>,
) -> AppResult<()> {
    require_max_len("name", name.map(str::trim), NAME_MAX_LEN)?;
    require_max_len("inverter_model", inverter_model, INVERTER_MODEL_MAX_LEN)?;
    require_max_len("timezone", timezone.map(str::trim), TIMEZONE_MAX_LEN)?;
    require_max_len("location_name", location_name, LOCATION_NAME_MAX_LEN)?;
    Ok(())
}

fn validate_specs(
    capacity: Option<f64>,
    panel_count: Option<i32>,
    panel_wattage: Option<f64>,
    tilt_angle: Option<f64>,
    azimuth: Option<f64>,
) -> AppResult<()> {
    require_non_negative("capacity", capacity)?;
    if panel_count.is_some_and(|c| c < 0) {
        return Err(AppError::validation("panel_count", "must not be negative"));
    }
    require_non_negative("panel_wattage", panel_wattage)?;
    require_range("tilt_angle", tilt_angle, 0.0, 90.0)?;
    require_range("azimuth", azimuth, 0.0, 360.0)?;
    Ok(())
}

/// Partial update of an installation.
///
/// Omitted fields are left alone; an explicit `null` clears a nullable field.
/// `system_id` is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSystemRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub capacity: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub panel_count: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub panel_wattage: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub inverter_model: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub timezone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub location_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub tilt_angle: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub azimuth: Option<Option<f64>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable_instant")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub installation_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Object>)]
    pub extra_metadata: Option<Option<Map<String, Value>>>,
}

impl UpdateSystemRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            require_not_blank("name", name)?;
        }
        validate_text(
            self.name.as_deref(),
            self.inverter_model.as_ref().and_then(|v| v.as_deref()),
            self.timezone.as_ref().and_then(|v| v.as_deref()),
            self.location_name.as_ref().and_then(|v| v.as_deref()),
        )?;
        validate_specs(
            self.capacity.flatten(),
            self.panel_count.flatten(),
            self.panel_wattage.flatten(),
            self.tilt_angle.flatten(),
            self.azimuth.flatten(),
        )?;
        require_range("latitude", self.latitude.flatten(), -90.0, 90.0)?;
        require_range("longitude", self.longitude.flatten(), -180.0, 180.0)?;
        require_timezone("timezone", self.timezone.as_ref().and_then(|tz| tz.as_deref()))?;
        Ok(())
    }

    /// Apply the patch field by field.
    ///
    /// Returns what the caller has to re-derive: whether coordinates moved and
    /// whether timezone / place name were set explicitly.
    pub fn apply(self, model: &mut systems::Model) -> PatchOutcome {
        let old_coordinates = model.coordinates();
        let outcome_timezone = self.timezone.is_some();
        let outcome_location_name = self.location_name.is_some();

        if let Some(v) = self.name {
            model.name = v;
        }
        if let Some(v) = self.capacity {
            model.capacity = v;
        }
        if let Some(v) = self.panel_count {
            model.panel_count = v;
        }
        if let Some(v) = self.panel_wattage {
            model.panel_wattage = v;
        }
        if let Some(v) = self.inverter_model {
            model.inverter_model = v;
        }
        if let Some(v) = self.location {
            model.location = v;
        }
        if let Some(v) = self.latitude {
            model.latitude = v;
        }
        if let Some(v) = self.longitude {
            model.longitude = v;
        }
        if let Some(v) = self.timezone {
            model.timezone = non_blank(v);
        }
        if let Some(v) = self.location_name {
            model.location_name = non_blank(v);
        }
        if let Some(v) = self.tilt_angle {
            model.tilt_angle = v;
        }
        if let Some(v) = self.azimuth {
            model.azimuth = v;
        }
        if let Some(v) = self.is_active {
            model.is_active = v;
        }
        if let Some(v) = self.installation_date {
            model.installation_date = v.map(Into::into);
        }
        if let Some(v) = self.extra_metadata {
            model.extra_metadata = v.map(Value::Object);
        }

        PatchOutcome {
            coordinates_changed: old_coordinates != model.coordinates(),
            timezone_set: outcome_timezone,
            location_name_set: outcome_location_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    pub coordinates_changed: bool,
    pub timezone_set: bool,
    pub location_name_set: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SystemResponse {
    pub id: i32,
    pub system_id: String,
    pub name: String,
    pub capacity: Option<f64>,
    pub panel_count: Option<i32>,
    pub panel_wattage: Option<f64>,
    pub inverter_model: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub location_name: Option<String>,
    pub tilt_angle: Option<f64>,
    pub azimuth: Option<f64>,
    pub is_active: bool,
    pub installation_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub extra_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<systems::Model> for SystemResponse {
    fn from(s: systems::Model) -> Self {
        Self {
            id: s.id,
            system_id: s.system_id,
            name: s.name,
            capacity: s.capacity,
            panel_count: s.panel_count,
            panel_wattage: s.panel_wattage,
            inverter_model: s.inverter_model,
            location: s.location,
            latitude: s.latitude,
            longitude: s.longitude,
            timezone: s.timezone,
            location_name: s.location_name,
            tilt_angle: s.tilt_angle,
            azimuth: s.azimuth,
            is_active: s.is_active,
            installation_date: s.installation_date.map(|d| d.with_timezone(&Utc)),
            extra_metadata: s.extra_metadata,
            created_at: s.created_at.with_timezone(&Utc),
            updated_at: s.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SystemsQuery {
    /// Filter by active status
    pub is_active: Option<bool>,
    /// Maximum number of results (default 100)
    pub limit: Option<u64>,
    /// Offset for pagination
    pub offset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_model() -> systems::Model {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        systems::Model {
            id: 1,
            system_id: "PV-001".to_string(),
            name: "Roof".to_string(),
            capacity: Some(10.0),
            panel_count: Some(40),
            panel_wattage: Some(250.0),
            inverter_model: Some("SE10000H".to_string()),
            location: None,
            latitude: Some(31.23),
            longitude: Some(121.47),
            timezone: Some("Asia/Shanghai".to_string()),
            location_name: None,
            tilt_angle: Some(30.0),
            azimuth: Some(180.0),
            is_active: true,
            installation_date: None,
            extra_metadata: None,
            created_at: t.into(),
            updated_at: t.into(),
        }
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: UpdateSystemRequest =
            serde_json::from_value(json!({"capacity": null, "name": "Roof B"})).unwrap();
        assert_eq!(patch.capacity, Some(None));
        assert_eq!(patch.panel_count, None);

        let mut model = sample_model();
        let outcome = patch.apply(&mut model);

        assert_eq!(model.name, "Roof B");
        assert_eq!(model.capacity, None);
        assert_eq!(model.panel_count, Some(40));
        assert!(!outcome.coordinates_changed);
        assert!(!outcome.timezone_set);
    }

    #[test]
    fn patch_reports_coordinate_change() {
        let patch: UpdateSystemRequest =
            serde_json::from_value(json!({"latitude": 47.37, "longitude": 8.54})).unwrap();
        let mut model = sample_model();
        let outcome = patch.apply(&mut model);

        assert!(outcome.coordinates_changed);
        // Timezone is left for the caller to re-derive
        assert_eq!(model.timezone.as_deref(), Some("Asia/Shanghai"));
    }

    #[test]
    fn patch_ignores_system_id() {
        let patch: UpdateSystemRequest =
            serde_json::from_value(json!({"system_id": "PV-999"})).unwrap();
        let mut model = sample_model();
        patch.apply(&mut model);
        assert_eq!(model.system_id, "PV-001");
    }

    #[test]
    fn patch_blank_timezone_clears() {
        let patch: UpdateSystemRequest = serde_json::from_value(json!({"timezone": " "})).unwrap();
        assert!(patch.validate().is_ok());
        let mut model = sample_model();
        let outcome = patch.apply(&mut model);
        assert!(outcome.timezone_set);
        assert_eq!(model.timezone, None);
    }

    #[test]
    fn create_validation_rejects_out_of_range() {
        let base = json!({"system_id": "PV-001", "name": "Roof"});

        let ok: CreateSystemRequest = serde_json::from_value(base.clone()).unwrap();
        assert!(ok.validate().is_ok());
        assert!(ok.is_active);

        for (field, value) in [
            ("latitude", json!(91.0)),
            ("longitude", json!(-180.5)),
            ("tilt_angle", json!(95.0)),
            ("azimuth", json!(361.0)),
            ("capacity", json!(-1.0)),
            ("timezone", json!("Nowhere/Land")),
        ] {
            let mut body = base.clone();
            body[field] = value;
            let req: CreateSystemRequest = serde_json::from_value(body).unwrap();
            match req.validate() {
                Err(AppError::Validation { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn text_fields_are_bounded_by_column_width() {
        let base = json!({"system_id": "PV-001", "name": "Roof"});

        for (field, value) in [
            ("system_id", json!("P".repeat(65))),
            ("name", json!("n".repeat(129))),
            ("inverter_model", json!("m".repeat(129))),
            ("timezone", json!("t".repeat(65))),
            ("location_name", json!("l".repeat(257))),
        ] {
            let mut body = base.clone();
            body[field] = value;
            let req: CreateSystemRequest = serde_json::from_value(body).unwrap();
            match req.validate() {
                Err(AppError::Validation { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }

        let mut at_limit = base;
        at_limit["name"] = json!("n".repeat(128));
        at_limit["location_name"] = json!("上".repeat(256));
        let req: CreateSystemRequest = serde_json::from_value(at_limit).unwrap();
        assert!(req.validate().is_ok());

        let patch: UpdateSystemRequest =
            serde_json::from_value(json!({"inverter_model": "m".repeat(129)})).unwrap();
        assert!(matches!(
            patch.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "inverter_model"
        ));
    }

    #[test]
    fn create_validation_rejects_blank_ids() {
        let req: CreateSystemRequest =
            serde_json::from_value(json!({"system_id": "  ", "name": "Roof"})).unwrap();
        assert!(req.validate().is_err());
    }
}
