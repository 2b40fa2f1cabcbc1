use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DAY_MS: i64 = 86_400_000;
pub const DISTRESS_MAX: u8 = 100;

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "ts", "time", "id"];
const SYSTOLIC_KEYS: &[&str] = &["systolic", "sys", "bpSys"];
const DIASTOLIC_KEYS: &[&str] = &["diastolic", "dia", "bpDia"];
const HEART_RATE_KEYS: &[&str] = &["heartRate", "hr", "pulse", "heart_rate"];
const NOTES_KEYS: &[&str] = &["notes", "note"];
const SYMPTOMS_KEYS: &[&str] = &["symptoms", "tags"];
const MOOD_KEYS: &[&str] = &["mood", "feeling"];
const MEDICATIONS_KEYS: &[&str] = &["medications", "meds"];
const DISTRESS_COMPUTED_KEYS: &[&str] = &["distressComputed", "distress"];
const DISTRESS_FINAL_KEYS: &[&str] = &["distressFinal", "distressUser"];
const MEDICATION_TIME_KEYS: &[&str] = &["atTimestamp", "at", "time"];

/// A weighted entry of the fixed symptom catalog used by the distress score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symptom {
    pub tag: &'static str,
    pub label: &'static str,
    pub weight: u32,
}

pub const SYMPTOM_CATALOG: &[Symptom] = &[
    Symptom { tag: "headache", label: "Headache", weight: 8 },
    Symptom { tag: "dizziness", label: "Dizziness", weight: 10 },
    Symptom { tag: "fatigue", label: "Fatigue", weight: 6 },
    Symptom { tag: "nausea", label: "Nausea", weight: 8 },
    Symptom { tag: "palpitations", label: "Palpitations", weight: 15 },
    Symptom { tag: "blurred_vision", label: "Blurred vision", weight: 15 },
    Symptom { tag: "shortness_of_breath", label: "Shortness of breath", weight: 20 },
    Symptom { tag: "chest_pain", label: "Chest pain", weight: 25 },
    Symptom { tag: "nosebleed", label: "Nosebleed", weight: 12 },
    Symptom { tag: "swelling", label: "Swelling", weight: 10 },
    Symptom { tag: "anxiety", label: "Anxiety", weight: 8 },
    Symptom { tag: "confusion", label: "Confusion", weight: 20 },
];

pub fn symptom(tag: &str) -> Option<&'static Symptom> {
    SYMPTOM_CATALOG.iter().find(|symptom| symptom.tag == tag)
}

/// Compresses the symptom burden into `0..=100`.
///
/// Unknown tags count towards the symptom-count bonus but carry no weight.
pub fn distress_score<'a>(tags: impl IntoIterator<Item = &'a String>) -> u8 {
    let mut count = 0u32;
    let mut weight_sum = 0u32;
    for tag in tags {
        count += 1;
        weight_sum += symptom(tag).map(|symptom| symptom.weight).unwrap_or(0);
    }

    let bonus = match count {
        0 | 1 => 0,
        2 | 3 => 5,
        4 | 5 => 10,
        _ => 20,
    };
    let raw = f64::from(weight_sum + bonus);
    let score = (100.0 * (1.0 - (-raw / 45.0).exp())).round();
    score.clamp(0.0, f64::from(DISTRESS_MAX)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Low,
    Anxious,
    Stressed,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Great,
        Mood::Good,
        Mood::Okay,
        Mood::Low,
        Mood::Anxious,
        Mood::Stressed,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Mood::Great => "great",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Low => "low",
            Mood::Anxious => "anxious",
            Mood::Stressed => "stressed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Great => "Great",
            Mood::Good => "Good",
            Mood::Okay => "Okay",
            Mood::Low => "Low",
            Mood::Anxious => "Anxious",
            Mood::Stressed => "Stressed",
        }
    }

    pub fn parse(input: &str) -> Option<Mood> {
        let needle = input.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.tag().eq_ignore_ascii_case(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEvent {
    pub name: String,
    pub at_timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u16>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub symptoms: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distress_computed: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distress_final: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distress_delta: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medications: Vec<MedicationEvent>,
}

impl Reading {
    pub fn vitals(
        timestamp: i64,
        systolic: Option<u16>,
        diastolic: Option<u16>,
        heart_rate: Option<u16>,
    ) -> Self {
        Self {
            timestamp,
            systolic,
            diastolic,
            heart_rate,
            ..Self::default()
        }
    }

    pub fn has_vitals(&self) -> bool {
        self.systolic.is_some() || self.diastolic.is_some() || self.heart_rate.is_some()
    }

    fn has_usable_fields(&self) -> bool {
        self.has_vitals()
            || !self.notes.trim().is_empty()
            || !self.symptoms.is_empty()
            || self.mood.is_some()
            || !self.medications.is_empty()
            || self.distress_computed.is_some()
            || self.distress_final.is_some()
    }

    /// Sets both distress values; `final_value` falls back to `computed`.
    pub fn set_distress(&mut self, computed: Option<u8>, final_value: Option<u8>) {
        self.distress_computed = computed.map(|value| value.min(DISTRESS_MAX));
        self.distress_final = final_value
            .or(computed)
            .map(|value| value.min(DISTRESS_MAX));
        self.refresh_distress_delta();
    }

    fn refresh_distress_delta(&mut self) {
        self.distress_delta = match (self.distress_computed, self.distress_final) {
            (Some(computed), Some(final_value)) => {
                Some(i16::from(final_value) - i16::from(computed))
            }
            _ => None,
        };
    }

    /// Records a medication marker; names are unique ignoring ASCII case.
    pub fn add_medication(&mut self, name: &str, at_timestamp: i64) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        if let Some(existing) = self
            .medications
            .iter_mut()
            .find(|event| event.name.eq_ignore_ascii_case(name))
        {
            existing.at_timestamp = at_timestamp;
            return false;
        }

        self.medications.push(MedicationEvent {
            name: name.to_string(),
            at_timestamp,
        });
        true
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.systolic, self.diastolic) {
            (Some(_), None) | (None, Some(_)) => return Err(ValidationError::OneSidedBloodPressure),
            (Some(systolic), Some(diastolic)) => {
                check_range(VitalField::Systolic, systolic)?;
                check_range(VitalField::Diastolic, diastolic)?;
                if diastolic >= systolic {
                    return Err(ValidationError::DiastolicNotBelowSystolic {
                        systolic,
                        diastolic,
                    });
                }
            }
            (None, None) => {}
        }

        if let Some(heart_rate) = self.heart_rate {
            check_range(VitalField::HeartRate, heart_rate)?;
        }

        Ok(())
    }

    pub fn apply_patch(&mut self, patch: &ReadingPatch) {
        if let Some(value) = patch.systolic {
            self.systolic = value;
        }
        if let Some(value) = patch.diastolic {
            self.diastolic = value;
        }
        if let Some(value) = patch.heart_rate {
            self.heart_rate = value;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(symptoms) = &patch.symptoms {
            self.symptoms = symptoms.clone();
        }
        if let Some(value) = patch.distress_computed {
            self.distress_computed = value;
        }
        if let Some(value) = patch.distress_final {
            self.distress_final = value;
        }
        if let Some(mood) = patch.mood {
            self.mood = mood;
        }
        if let Some(medications) = &patch.medications {
            self.medications = medications.clone();
        }
        self.refresh_distress_delta();
    }

    pub fn blood_pressure_label(&self) -> String {
        match (self.systolic, self.diastolic) {
            (Some(systolic), Some(diastolic)) => format!("{systolic}/{diastolic}"),
            _ => "--/--".to_string(),
        }
    }

    pub fn heart_rate_label(&self) -> String {
        self.heart_rate
            .map(|value| format!("{value} bpm"))
            .unwrap_or_else(|| "-- bpm".to_string())
    }
}

/// Field-level changes; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingPatch {
    pub systolic: Option<Option<u16>>,
    pub diastolic: Option<Option<u16>>,
    pub heart_rate: Option<Option<u16>>,
    pub notes: Option<String>,
    pub symptoms: Option<BTreeSet<String>>,
    pub distress_computed: Option<Option<u8>>,
    pub distress_final: Option<Option<u8>>,
    pub mood: Option<Option<Mood>>,
    pub medications: Option<Vec<MedicationEvent>>,
}

impl ReadingPatch {
    pub fn is_empty(&self) -> bool {
        self == &ReadingPatch::default()
    }

    /// Builds the record a first save creates from this patch.
    pub fn into_reading(self, timestamp: i64) -> Reading {
        let mut reading = Reading {
            timestamp,
            ..Reading::default()
        };
        reading.apply_patch(&self);
        reading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalField {
    Systolic,
    Diastolic,
    HeartRate,
}

impl VitalField {
    pub fn label(self) -> &'static str {
        match self {
            VitalField::Systolic => "systolic",
            VitalField::Diastolic => "diastolic",
            VitalField::HeartRate => "heart rate",
        }
    }

    pub fn range(self) -> (u16, u16) {
        match self {
            VitalField::Systolic => (60, 260),
            VitalField::Diastolic => (30, 180),
            VitalField::HeartRate => (25, 240),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    OneSidedBloodPressure,
    OutOfRange {
        field: VitalField,
        value: u16,
    },
    DiastolicNotBelowSystolic {
        systolic: u16,
        diastolic: u16,
    },
    NotANumber {
        field: VitalField,
        input: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::OneSidedBloodPressure => {
                write!(f, "enter both systolic and diastolic, or leave both empty")
            }
            ValidationError::OutOfRange { field, value } => {
                let (min, max) = field.range();
                write!(f, "{} {value} is outside {min}-{max}", field.label())
            }
            ValidationError::DiastolicNotBelowSystolic {
                systolic,
                diastolic,
            } => write!(
                f,
                "diastolic {diastolic} must be lower than systolic {systolic}"
            ),
            ValidationError::NotANumber { field, input } => {
                write!(f, "{} '{input}' is not a number", field.label())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

fn check_range(field: VitalField, value: u16) -> Result<(), ValidationError> {
    let (min, max) = field.range();
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(())
}

/// Parses a typed vital. Blank input and `0` both mean "not provided".
pub fn parse_vital_input(field: VitalField, input: &str) -> Result<Option<u16>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = trimmed
        .parse::<u16>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            input: trimmed.to_string(),
        })?;
    Ok(if value == 0 { None } else { Some(value) })
}

/// Key set used when writing rows back to storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldNaming {
    #[default]
    Canonical,
    /// Short keys (`ts`, `sys`, `dia`, `hr`, `note`, `tags`, `feeling`, `meds`) read by older files.
    Legacy,
}

/// The stored row for a reading. Either naming reads back through `normalize_record`.
pub fn denormalize(reading: &Reading, naming: FieldNaming) -> Result<Value, serde_json::Error> {
    match naming {
        FieldNaming::Canonical => serde_json::to_value(reading),
        FieldNaming::Legacy => Ok(legacy_row(reading)),
    }
}

fn legacy_row(reading: &Reading) -> Value {
    let mut row = Map::new();
    row.insert("ts".to_string(), Value::from(reading.timestamp));
    let vitals = [
        ("sys", reading.systolic),
        ("dia", reading.diastolic),
        ("hr", reading.heart_rate),
    ];
    for (key, value) in vitals {
        if let Some(value) = value {
            row.insert(key.to_string(), Value::from(value));
        }
    }
    if !reading.notes.is_empty() {
        row.insert("note".to_string(), Value::from(reading.notes.as_str()));
    }
    if !reading.symptoms.is_empty() {
        let tags = reading.symptoms.iter().map(|tag| Value::from(tag.as_str()));
        row.insert("tags".to_string(), Value::Array(tags.collect()));
    }
    if let Some(value) = reading.distress_computed {
        row.insert("distress".to_string(), Value::from(value));
    }
    if let Some(value) = reading.distress_final {
        row.insert("distressUser".to_string(), Value::from(value));
    }
    if let Some(mood) = reading.mood {
        row.insert("feeling".to_string(), Value::from(mood.tag()));
    }
    if !reading.medications.is_empty() {
        let meds = reading
            .medications
            .iter()
            .map(|event| {
                let mut entry = Map::new();
                entry.insert("name".to_string(), Value::from(event.name.as_str()));
                entry.insert("at".to_string(), Value::from(event.at_timestamp));
                Value::Object(entry)
            })
            .collect();
        row.insert("meds".to_string(), Value::Array(meds));
    }
    Value::Object(row)
}

/// Best-effort conversion of a stored row into a `Reading`.
///
/// Rows without a usable timestamp, or with no usable field at all, yield `None`.
/// A blood pressure half without its partner is dropped.
pub fn normalize_record(raw: &Value) -> Option<Reading> {
    let row = raw.as_object()?;
    let timestamp = first_present(row, TIMESTAMP_KEYS).and_then(parse_timestamp)?;

    let mut reading = Reading {
        timestamp,
        systolic: first_present(row, SYSTOLIC_KEYS).and_then(parse_positive_u16),
        diastolic: first_present(row, DIASTOLIC_KEYS).and_then(parse_positive_u16),
        heart_rate: first_present(row, HEART_RATE_KEYS).and_then(parse_positive_u16),
        notes: first_present(row, NOTES_KEYS)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        symptoms: first_present(row, SYMPTOMS_KEYS)
            .map(parse_tags)
            .unwrap_or_default(),
        mood: first_present(row, MOOD_KEYS)
            .and_then(Value::as_str)
            .and_then(Mood::parse),
        ..Reading::default()
    };

    if reading.systolic.is_some() != reading.diastolic.is_some() {
        log::debug!("dropping one-sided blood pressure on record {timestamp}");
        reading.systolic = None;
        reading.diastolic = None;
    }

    let computed = first_present(row, DISTRESS_COMPUTED_KEYS).and_then(parse_distress);
    let final_value = first_present(row, DISTRESS_FINAL_KEYS).and_then(parse_distress);
    if computed.is_some() || final_value.is_some() {
        reading.set_distress(computed, final_value);
    }

    if let Some(Value::Array(entries)) = first_present(row, MEDICATIONS_KEYS) {
        for entry in entries {
            match entry {
                Value::String(name) => {
                    reading.add_medication(name, timestamp);
                }
                Value::Object(fields) => {
                    let Some(name) = fields.get("name").and_then(Value::as_str) else {
                        continue;
                    };
                    let at = first_present(fields, MEDICATION_TIME_KEYS)
                        .and_then(parse_timestamp)
                        .unwrap_or(timestamp);
                    reading.add_medication(name, at);
                }
                _ => {}
            }
        }
    }

    if reading.has_usable_fields() {
        Some(reading)
    } else {
        None
    }
}

fn first_present<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_positive_u16(value: &Value) -> Option<u16> {
    let number = parse_number(value)?.round();
    if number <= 0.0 || number > f64::from(u16::MAX) {
        return None;
    }
    Some(number as u16)
}

fn parse_distress(value: &Value) -> Option<u8> {
    let number = parse_number(value)?.round();
    if number < 0.0 {
        return None;
    }
    Some(number.min(f64::from(DISTRESS_MAX)) as u8)
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    if let Value::String(text) = value {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text.trim()) {
            return Some(parsed.timestamp_millis());
        }
    }

    let number = parse_number(value)?;
    if number <= 0.0 || !number.is_finite() {
        return None;
    }
    Some(number as i64)
}

fn parse_tags(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        _ => BTreeSet::new(),
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn local_datetime(timestamp_ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(timestamp_ms).single()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    local_datetime(timestamp_ms)
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "(invalid time)".to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        FieldNaming, Mood, Reading, ReadingPatch, ValidationError, VitalField, denormalize,
        distress_score, normalize_record, parse_vital_input,
    };

    fn full_reading() -> Reading {
        let mut reading = Reading::vitals(1_767_258_000_000, Some(132), Some(84), Some(74));
        reading.notes = "after walk".to_string();
        reading.symptoms.insert("headache".to_string());
        reading.symptoms.insert("fatigue".to_string());
        reading.set_distress(Some(30), Some(45));
        reading.mood = Some(Mood::Anxious);
        reading.add_medication("Lisinopril", 1_767_257_000_000);
        reading
    }

    #[test]
    fn legacy_and_canonical_names_normalize_to_the_same_record() {
        let reading = full_reading();
        for naming in [FieldNaming::Canonical, FieldNaming::Legacy] {
            let row = denormalize(&reading, naming).expect("reading should serialize");
            let restored = normalize_record(&row).expect("row should normalize");
            assert_eq!(restored, reading, "{naming:?} row did not round-trip");
        }
    }

    #[test]
    fn legacy_naming_writes_short_keys() {
        let row = denormalize(&full_reading(), FieldNaming::Legacy).expect("reading should serialize");
        assert_eq!(row["ts"], 1_767_258_000_000_i64);
        assert_eq!(row["sys"], 132);
        assert_eq!(row["feeling"], Mood::Anxious.tag());
        assert_eq!(row["meds"][0]["name"], "Lisinopril");
        assert!(row.get("systolic").is_none());
        assert!(row.get("timestamp").is_none());

        let sparse = denormalize(&Reading::vitals(5_000, None, None, Some(61)), FieldNaming::Legacy)
            .expect("reading should serialize");
        assert_eq!(sparse, json!({ "ts": 5_000, "hr": 61 }));
    }

    #[test]
    fn accepts_short_aliases_and_numeric_strings() {
        let row = json!({ "id": "1767258000000", "sys": "128", "dia": 82, "pulse": 70 });
        let reading = normalize_record(&row).expect("row should normalize");
        assert_eq!(reading.timestamp, 1_767_258_000_000);
        assert_eq!(reading.systolic, Some(128));
        assert_eq!(reading.diastolic, Some(82));
        assert_eq!(reading.heart_rate, Some(70));
    }

    #[test]
    fn zero_vitals_are_not_provided() {
        let row = json!({ "timestamp": 1_000, "systolic": 0, "diastolic": 0, "heartRate": 61 });
        let reading = normalize_record(&row).expect("row should normalize");
        assert_eq!((reading.systolic, reading.diastolic), (None, None));
        assert_eq!(reading.heart_rate, Some(61));

        assert_eq!(
            parse_vital_input(VitalField::Systolic, "0").expect("zero should parse"),
            None
        );
    }

    #[test]
    fn one_sided_pressure_is_dropped_on_read() {
        let row = json!({ "timestamp": 1_000, "systolic": 150, "heartRate": 80 });
        let reading = normalize_record(&row).expect("row should normalize");
        assert_eq!(reading.systolic, None);
        assert_eq!(reading.diastolic, None);
    }

    #[test]
    fn rows_without_timestamp_or_fields_are_dropped() {
        assert!(normalize_record(&json!({ "systolic": 120, "diastolic": 80 })).is_none());
        assert!(normalize_record(&json!({ "timestamp": 1_000, "notes": "  " })).is_none());
        assert!(normalize_record(&json!("not an object")).is_none());
    }

    #[test]
    fn medications_are_unique_ignoring_case() {
        let mut reading = Reading::vitals(1_000, None, None, Some(70));
        assert!(reading.add_medication("Aspirin", 1_000));
        assert!(!reading.add_medication("aspirin", 2_000));
        assert_eq!(reading.medications.len(), 1);
        assert_eq!(reading.medications[0].at_timestamp, 2_000);
    }

    #[test]
    fn validation_rejects_one_sided_pressure() {
        let reading = Reading::vitals(1_000, Some(150), None, None);
        assert_eq!(reading.validate(), Err(ValidationError::OneSidedBloodPressure));
        let reading = Reading::vitals(1_000, Some(80), Some(90), None);
        assert!(matches!(
            reading.validate(),
            Err(ValidationError::DiastolicNotBelowSystolic { .. })
        ));
    }

    #[test]
    fn patch_preserves_absent_fields() {
        let mut reading = full_reading();
        reading.apply_patch(&ReadingPatch {
            heart_rate: Some(Some(90)),
            distress_final: Some(Some(20)),
            ..ReadingPatch::default()
        });
        assert_eq!(reading.heart_rate, Some(90));
        assert_eq!(reading.systolic, Some(132));
        assert_eq!(reading.notes, "after walk");
        assert_eq!(reading.distress_delta, Some(-10));
    }

    #[test]
    fn distress_score_saturates_towards_one_hundred() {
        let none: Vec<String> = Vec::new();
        assert_eq!(distress_score(&none), 0);

        let single = vec!["headache".to_string()];
        // raw 8 -> 100 * (1 - e^(-8/45)) = 16.3
        assert_eq!(distress_score(&single), 16);

        let many = [
            "chest_pain",
            "shortness_of_breath",
            "confusion",
            "palpitations",
            "blurred_vision",
            "dizziness",
        ]
        .iter()
        .map(|tag| tag.to_string())
        .collect::<Vec<_>>();
        let score = distress_score(&many);
        assert!(score > 90 && score <= 100, "score was {score}");
    }
}
