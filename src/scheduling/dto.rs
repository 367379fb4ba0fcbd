//! Serializable views of an employee schedule.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{Availability, Employee, EmployeeSchedule, Shift};
use super::state::ScheduleState;
use crate::error::{PlanningError, Result};
use crate::score::HardSoftScore;

fn sorted_dates(dates: &HashSet<NaiveDate>) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = dates.iter().copied().collect();
    dates.sort_unstable();
    dates
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub name: String,
    pub skills: Vec<String>,
    #[serde(default)]
    pub unavailable_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub undesired_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub desired_dates: Vec<NaiveDate>,
}

impl From<&Employee> for EmployeeDto {
    fn from(e: &Employee) -> Self {
        let mut skills: Vec<String> = e.skills.iter().cloned().collect();
        skills.sort_unstable();
        Self {
            name: e.name.clone(),
            skills,
            unavailable_dates: sorted_dates(&e.unavailable_dates),
            undesired_dates: sorted_dates(&e.undesired_dates),
            desired_dates: sorted_dates(&e.desired_dates),
        }
    }
}

impl EmployeeDto {
    pub fn to_employee(&self, index: usize) -> Employee {
        Employee::new(index, self.name.clone())
            .with_skills(self.skills.iter().cloned())
            .with_unavailable_dates(self.unavailable_dates.iter().copied())
            .with_undesired_dates(self.undesired_dates.iter().copied())
            .with_desired_dates(self.desired_dates.iter().copied())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDto {
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: String,
    pub required_skill: String,
    #[serde(default)]
    pub employee: Option<EmployeeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub employees: Vec<EmployeeDto>,
    pub shifts: Vec<ShiftDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availabilities: Vec<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_state: Option<ScheduleState>,
    #[serde(default)]
    pub score: Option<String>,
}

impl ScheduleDto {
    pub fn from_schedule(schedule: &EmployeeSchedule) -> Self {
        let employees: Vec<EmployeeDto> = schedule.employees().iter().map(EmployeeDto::from).collect();

        let shifts: Vec<ShiftDto> = schedule
            .shifts()
            .iter()
            .map(|s| ShiftDto {
                id: s.id.clone(),
                start: s.start,
                end: s.end,
                location: s.location.clone(),
                required_skill: s.required_skill.clone(),
                employee: s.employee_idx().and_then(|idx| employees.get(idx)).cloned(),
            })
            .collect();

        Self {
            employees,
            shifts,
            availabilities: Vec::new(),
            schedule_state: schedule.schedule_state().cloned(),
            score: schedule.score().map(|s| s.to_string()),
        }
    }

    /// Builds and finalizes a schedule. Shift employees are matched by name.
    pub fn to_domain(&self) -> Result<EmployeeSchedule> {
        let employees: Vec<Employee> = self
            .employees
            .iter()
            .enumerate()
            .map(|(i, dto)| dto.to_employee(i))
            .collect();
        let name_to_idx: HashMap<&str, usize> = employees
            .iter()
            .map(|e| (e.name.as_str(), e.index))
            .collect();

        let shifts = self
            .shifts
            .iter()
            .map(|s| -> Result<Shift> {
                let shift = Shift::new(s.id.clone(), s.start, s.end, s.location.clone(), s.required_skill.clone());
                let Some(employee) = &s.employee else {
                    return Ok(shift);
                };
                let idx = name_to_idx.get(employee.name.as_str()).copied().ok_or_else(|| {
                    PlanningError::InvalidProblem(format!(
                        "shift {} assigned to unknown employee {}",
                        s.id, employee.name
                    ))
                })?;
                Ok(shift.with_employee(idx))
            })
            .collect::<Result<Vec<_>>>()?;

        let score = self.score.as_deref().map(HardSoftScore::parse).transpose()?;

        let mut schedule = EmployeeSchedule::new(employees, shifts);
        if let Some(state) = &self.schedule_state {
            schedule = schedule.with_schedule_state(state.clone());
        }
        schedule.apply_availabilities(&self.availabilities)?;
        schedule.finalize()?;
        schedule.score = score;
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::AvailabilityType;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn json() -> serde_json::Value {
        serde_json::json!({
            "employees": [
                { "name": "Amy", "skills": ["Nurse"] },
                { "name": "Beth", "skills": ["Doctor", "Nurse"], "desiredDates": ["2024-05-06"] }
            ],
            "shifts": [
                {
                    "id": "1",
                    "start": "2024-05-06T06:00:00",
                    "end": "2024-05-06T14:00:00",
                    "location": "Ward",
                    "requiredSkill": "Nurse",
                    "employee": { "name": "Beth", "skills": ["Doctor", "Nurse"] }
                },
                {
                    "id": "2",
                    "start": "2024-05-06T14:00:00",
                    "end": "2024-05-06T22:00:00",
                    "location": "Ward",
                    "requiredSkill": "Nurse",
                    "employee": null
                }
            ],
            "availabilities": [
                { "id": "a1", "employee": "Amy", "date": "2024-05-06", "availabilityType": "UNAVAILABLE" }
            ],
            "score": "-1hard/5soft"
        })
    }

    #[test]
    fn test_to_domain() {
        let dto: ScheduleDto = serde_json::from_value(json()).unwrap();
        assert_eq!(dto.availabilities[0].availability_type, AvailabilityType::Unavailable);

        let schedule = dto.to_domain().unwrap();
        assert_eq!(schedule.shifts()[0].employee_idx(), Some(1));
        assert_eq!(schedule.shifts()[1].employee_idx(), None);
        assert_eq!(schedule.shifts_of(1), &[0]);
        assert!(schedule.employees()[0].unavailable_dates.contains(&day()));
        assert!(schedule.employees()[1].desired_dates.contains(&day()));
        assert_eq!(schedule.score(), Some(HardSoftScore::of(-1, 5)));
    }

    #[test]
    fn test_from_schedule_round_trip() {
        let schedule = serde_json::from_value::<ScheduleDto>(json()).unwrap().to_domain().unwrap();
        let json = serde_json::to_value(ScheduleDto::from_schedule(&schedule)).unwrap();

        assert_eq!(json["shifts"][0]["employee"]["name"], "Beth");
        assert!(json["shifts"][1]["employee"].is_null());
        assert_eq!(json["employees"][0]["unavailableDates"][0], "2024-05-06");
        assert!(json.get("availabilities").is_none());
        assert_eq!(json["score"], "-1hard/5soft");

        let back = serde_json::from_value::<ScheduleDto>(json).unwrap().to_domain().unwrap();
        assert_eq!(back.shifts_of(1), schedule.shifts_of(1));
    }

    #[test]
    fn test_malformed_input() {
        let mut value = json();
        value["score"] = "oops".into();
        let dto: ScheduleDto = serde_json::from_value(value).unwrap();
        assert!(matches!(dto.to_domain(), Err(PlanningError::ScoreParse(_))));

        let mut value = json();
        value["employees"][0]["desiredDates"] = serde_json::json!(["2024-05-06"]);
        let dto: ScheduleDto = serde_json::from_value(value).unwrap();
        assert!(matches!(dto.to_domain(), Err(PlanningError::InvalidProblem(_))));

        let mut value = json();
        value["shifts"][0]["employee"]["name"] = "Zed".into();
        let dto: ScheduleDto = serde_json::from_value(value).unwrap();
        assert!(matches!(dto.to_domain(), Err(PlanningError::InvalidProblem(_))));
    }
}
