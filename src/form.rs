use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::domain::{
    DISTRESS_MAX, MedicationEvent, Mood, Reading, ReadingPatch, ValidationError, VitalField,
    distress_score, now_ms, parse_vital_input,
};
use crate::store::{RecordKey, RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    Vitals,
    Symptoms,
    Mood,
    MedicationsNotes,
    Summary,
}

impl FormStep {
    pub const ALL: [FormStep; 5] = [
        FormStep::Vitals,
        FormStep::Symptoms,
        FormStep::Mood,
        FormStep::MedicationsNotes,
        FormStep::Summary,
    ];

    pub fn next(self) -> Option<FormStep> {
        match self {
            FormStep::Vitals => Some(FormStep::Symptoms),
            FormStep::Symptoms => Some(FormStep::Mood),
            FormStep::Mood => Some(FormStep::MedicationsNotes),
            FormStep::MedicationsNotes => Some(FormStep::Summary),
            FormStep::Summary => None,
        }
    }

    pub fn prev(self) -> Option<FormStep> {
        match self {
            FormStep::Vitals => None,
            FormStep::Symptoms => Some(FormStep::Vitals),
            FormStep::Mood => Some(FormStep::Symptoms),
            FormStep::MedicationsNotes => Some(FormStep::Mood),
            FormStep::Summary => Some(FormStep::MedicationsNotes),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FormStep::Vitals => "Vitals",
            FormStep::Symptoms => "Symptoms",
            FormStep::Mood => "Mood",
            FormStep::MedicationsNotes => "Medications & notes",
            FormStep::Summary => "Summary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Add,
    Edit,
}

#[derive(Debug)]
pub enum FormError {
    Validation(ValidationError),
    Store(StoreError),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::Validation(err) => write!(f, "{err}"),
            FormError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FormError {}

impl From<ValidationError> for FormError {
    fn from(err: ValidationError) -> Self {
        FormError::Validation(err)
    }
}

impl From<StoreError> for FormError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(err) => FormError::Validation(err),
            other => FormError::Store(other),
        }
    }
}

/// One pass through the add/edit steps. Every save after the first patches
/// the record created (or opened) by this session.
#[derive(Debug, Clone)]
pub struct FormSession {
    mode: SessionMode,
    step: FormStep,
    saved_timestamp: Option<i64>,
    pub systolic_input: String,
    pub diastolic_input: String,
    pub heart_rate_input: String,
    symptoms: BTreeSet<String>,
    distress_override: Option<u8>,
    pub mood: Option<Mood>,
    medications: Vec<MedicationEvent>,
    pub notes: String,
}

impl FormSession {
    pub fn new_add() -> Self {
        Self {
            mode: SessionMode::Add,
            step: FormStep::Vitals,
            saved_timestamp: None,
            systolic_input: String::new(),
            diastolic_input: String::new(),
            heart_rate_input: String::new(),
            symptoms: BTreeSet::new(),
            distress_override: None,
            mood: None,
            medications: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn edit(reading: &Reading) -> Self {
        let computed = distress_for(&reading.symptoms);
        let distress_override = reading
            .distress_final
            .filter(|value| Some(*value) != computed);
        Self {
            mode: SessionMode::Edit,
            step: FormStep::Vitals,
            saved_timestamp: Some(reading.timestamp),
            systolic_input: number_input(reading.systolic),
            diastolic_input: number_input(reading.diastolic),
            heart_rate_input: number_input(reading.heart_rate),
            symptoms: reading.symptoms.clone(),
            distress_override,
            mood: reading.mood,
            medications: reading.medications.clone(),
            notes: reading.notes.clone(),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn saved_timestamp(&self) -> Option<i64> {
        self.saved_timestamp
    }

    pub fn symptoms(&self) -> &BTreeSet<String> {
        &self.symptoms
    }

    pub fn medications(&self) -> &[MedicationEvent] {
        &self.medications
    }

    pub fn toggle_symptom(&mut self, tag: &str) {
        if !self.symptoms.remove(tag) {
            self.symptoms.insert(tag.to_string());
        }
    }

    pub fn distress_computed(&self) -> Option<u8> {
        distress_for(&self.symptoms)
    }

    /// Follows the computed score until the user moves it.
    pub fn distress_final(&self) -> Option<u8> {
        self.distress_override.or_else(|| self.distress_computed())
    }

    pub fn distress_overridden(&self) -> bool {
        self.distress_override.is_some()
    }

    pub fn adjust_distress(&mut self, delta: i16) {
        let current = i16::from(self.distress_final().unwrap_or(0));
        let next = (current + delta).clamp(0, i16::from(DISTRESS_MAX));
        self.distress_override = Some(next as u8);
    }

    pub fn reset_distress(&mut self) {
        self.distress_override = None;
    }

    pub fn add_medication(&mut self, name: &str) -> bool {
        let mut scratch = Reading {
            medications: std::mem::take(&mut self.medications),
            ..Reading::default()
        };
        let added = scratch.add_medication(name, now_ms());
        self.medications = scratch.medications;
        added
    }

    pub fn remove_last_medication(&mut self) -> Option<MedicationEvent> {
        self.medications.pop()
    }

    pub fn patch_for_step(&self, step: FormStep) -> Result<ReadingPatch, ValidationError> {
        let patch = match step {
            FormStep::Vitals => {
                let systolic = parse_vital_input(VitalField::Systolic, &self.systolic_input)?;
                let diastolic = parse_vital_input(VitalField::Diastolic, &self.diastolic_input)?;
                let heart_rate = parse_vital_input(VitalField::HeartRate, &self.heart_rate_input)?;
                Reading::vitals(0, systolic, diastolic, heart_rate).validate()?;
                ReadingPatch {
                    systolic: Some(systolic),
                    diastolic: Some(diastolic),
                    heart_rate: Some(heart_rate),
                    ..ReadingPatch::default()
                }
            }
            FormStep::Symptoms => ReadingPatch {
                symptoms: Some(self.symptoms.clone()),
                distress_computed: Some(self.distress_computed()),
                distress_final: Some(self.distress_final()),
                ..ReadingPatch::default()
            },
            FormStep::Mood => ReadingPatch {
                mood: Some(self.mood),
                ..ReadingPatch::default()
            },
            FormStep::MedicationsNotes => ReadingPatch {
                medications: Some(self.medications.clone()),
                notes: Some(self.notes.trim().to_string()),
                ..ReadingPatch::default()
            },
            FormStep::Summary => ReadingPatch::default(),
        };
        Ok(patch)
    }

    /// Persists the fields owned by the current step.
    ///
    /// Returns `None` when nothing has been created yet and the step has
    /// nothing worth storing.
    pub fn save_step(&mut self, store: &mut RecordStore) -> Result<Option<Reading>, FormError> {
        let patch = self.patch_for_step(self.step)?;
        match self.saved_timestamp {
            Some(timestamp) => {
                if patch.is_empty() {
                    return Ok(store.get(timestamp));
                }
                let saved = store.update(RecordKey::Timestamp(timestamp), &patch)?;
                Ok(Some(saved))
            }
            None => {
                let draft = patch.into_reading(0);
                if !draft.has_vitals()
                    && draft.symptoms.is_empty()
                    && draft.mood.is_none()
                    && draft.medications.is_empty()
                    && draft.notes.is_empty()
                {
                    return Ok(None);
                }
                let created = store.add(draft)?;
                log::info!("created reading {}", created.timestamp);
                self.saved_timestamp = Some(created.timestamp);
                Ok(Some(created))
            }
        }
    }

    /// Saves the current step and moves to the next one.
    pub fn advance(&mut self, store: &mut RecordStore) -> Result<Option<Reading>, FormError> {
        let saved = self.save_step(store)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(saved)
    }

    pub fn back(&mut self) {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
    }

    /// What the record will look like with every step applied.
    pub fn preview(&self) -> Reading {
        let mut reading = Reading {
            timestamp: self.saved_timestamp.unwrap_or(0),
            ..Reading::default()
        };
        for step in FormStep::ALL {
            if let Ok(patch) = self.patch_for_step(step) {
                reading.apply_patch(&patch);
            }
        }
        reading
    }
}

fn distress_for(symptoms: &BTreeSet<String>) -> Option<u8> {
    if symptoms.is_empty() {
        None
    } else {
        Some(distress_score(symptoms))
    }
}

fn number_input(value: Option<u16>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use crate::domain::{Mood, Reading, ValidationError};
    use crate::storage::MemoryBackend;
    use crate::store::RecordStore;

    use super::{FormError, FormSession, FormStep, SessionMode};

    fn store() -> RecordStore {
        RecordStore::new(Box::new(MemoryBackend::default()))
    }

    #[test]
    fn first_save_creates_and_later_saves_patch() {
        let mut store = store();
        let mut session = FormSession::new_add();
        session.systolic_input = "132".to_string();
        session.diastolic_input = "84".to_string();
        session.heart_rate_input = "74".to_string();

        let created = session
            .advance(&mut store)
            .expect("vitals should save")
            .expect("record should be created");
        assert_eq!(session.step(), FormStep::Symptoms);

        session.toggle_symptom("headache");
        session.advance(&mut store).expect("symptoms should save");
        session.mood = Some(Mood::Low);
        session.advance(&mut store).expect("mood should save");
        session.notes = "  after coffee ".to_string();
        session.add_medication("Amlodipine");
        let saved = session
            .advance(&mut store)
            .expect("notes should save")
            .expect("record should exist");

        assert_eq!(store.get_all().len(), 1);
        assert_eq!(saved.timestamp, created.timestamp);
        assert_eq!(saved.systolic, Some(132));
        assert_eq!(saved.heart_rate, Some(74));
        assert!(saved.symptoms.contains("headache"));
        assert_eq!(saved.distress_final, saved.distress_computed);
        assert_eq!(saved.mood, Some(Mood::Low));
        assert_eq!(saved.notes, "after coffee");
        assert_eq!(saved.medications.len(), 1);
        assert_eq!(session.step(), FormStep::Summary);
    }

    #[test]
    fn one_sided_pressure_blocks_the_step() {
        let mut store = store();
        let mut session = FormSession::new_add();
        session.systolic_input = "150".to_string();

        let result = session.advance(&mut store);
        assert!(matches!(
            result,
            Err(FormError::Validation(ValidationError::OneSidedBloodPressure))
        ));
        assert_eq!(session.step(), FormStep::Vitals);
        assert!(store.get_all().is_empty());

        session.diastolic_input = "0".to_string();
        assert!(session.advance(&mut store).is_err());
        session.systolic_input = "0".to_string();
        session.heart_rate_input = "68".to_string();
        assert!(session.advance(&mut store).expect("save should work").is_some());
    }

    #[test]
    fn every_add_starts_a_fresh_session() {
        let mut store = store();
        let mut first = FormSession::new_add();
        first.heart_rate_input = "70".to_string();
        first.advance(&mut store).expect("save should work");

        let mut second = FormSession::new_add();
        assert_eq!(second.saved_timestamp(), None);
        second.heart_rate_input = "90".to_string();
        second.advance(&mut store).expect("save should work");

        assert_eq!(store.get_all().len(), 2);
    }

    #[test]
    fn skipped_empty_step_creates_nothing() {
        let mut store = store();
        let mut session = FormSession::new_add();
        assert!(session.advance(&mut store).expect("empty save is fine").is_none());
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn distress_stops_tracking_after_manual_change() {
        let mut session = FormSession::new_add();
        session.toggle_symptom("headache");
        let computed = session.distress_computed().expect("score should exist");
        assert_eq!(session.distress_final(), Some(computed));

        session.adjust_distress(10);
        assert_eq!(session.distress_final(), Some(computed + 10));
        session.toggle_symptom("chest_pain");
        assert_ne!(session.distress_computed(), Some(computed));
        assert_eq!(session.distress_final(), Some(computed + 10));

        session.adjust_distress(500);
        assert_eq!(session.distress_final(), Some(100));
        session.reset_distress();
        assert_eq!(session.distress_final(), session.distress_computed());
    }

    #[test]
    fn edit_patches_only_the_current_step() {
        let mut store = store();
        let mut original = Reading::vitals(9_000, Some(140), Some(90), Some(80));
        original.notes = "morning".to_string();
        original.mood = Some(Mood::Okay);
        store.add(original).expect("add should succeed");

        let reading = store.get(9_000).expect("reading should exist");
        let mut session = FormSession::edit(&reading);
        assert_eq!(session.mode(), SessionMode::Edit);
        assert_eq!(session.systolic_input, "140");

        session.advance(&mut store).expect("vitals should save");
        session.advance(&mut store).expect("symptoms should save");
        session.mood = Some(Mood::Great);
        let saved = session
            .save_step(&mut store)
            .expect("mood should save")
            .expect("record should exist");

        assert_eq!(saved.timestamp, 9_000);
        assert_eq!(saved.mood, Some(Mood::Great));
        assert_eq!(saved.notes, "morning");
        assert_eq!(store.get_all().len(), 1);
    }
}
