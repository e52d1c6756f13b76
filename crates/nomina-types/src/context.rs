use crate::id::Id;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instructor category, selecting which tariff parameter set applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstructorCategory {
    /// Regular instructor
    Instructor,
    /// Junior ambassador
    EmbajadorJunior,
    /// Ambassador
    Embajador,
    /// Senior ambassador
    EmbajadorSenior,
}

impl InstructorCategory {
    /// All categories, from lowest to highest.
    pub const ALL: [Self; 4] =
        [Self::Instructor, Self::EmbajadorJunior, Self::Embajador, Self::EmbajadorSenior];

    /// Persisted name of the category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instructor => "INSTRUCTOR",
            Self::EmbajadorJunior => "EMBAJADOR_JUNIOR",
            Self::Embajador => "EMBAJADOR",
            Self::EmbajadorSenior => "EMBAJADOR_SENIOR",
        }
    }
}

impl fmt::Display for InstructorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named numeric field an input node can read from the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    /// `reservaciones`
    Reservations,
    /// `capacidad`, also accepted as `lugares`
    Capacity,
    /// `listaEspera`
    Waitlist,
    /// `cortesias`
    Courtesies,
    /// `reservasPagadas`
    PaidReservations,
}

impl ContextField {
    /// Resolves a field name as written in formulas.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reservaciones" => Some(Self::Reservations),
            "capacidad" | "lugares" => Some(Self::Capacity),
            "listaEspera" => Some(Self::Waitlist),
            "cortesias" => Some(Self::Courtesies),
            "reservasPagadas" => Some(Self::PaidReservations),
            _ => None,
        }
    }

    /// Canonical field name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reservations => "reservaciones",
            Self::Capacity => "capacidad",
            Self::Waitlist => "listaEspera",
            Self::Courtesies => "cortesias",
            Self::PaidReservations => "reservasPagadas",
        }
    }
}

/// Read-only inputs for one evaluation: the attendance of one class occurrence
/// and the category of the instructor who taught it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Total reservations
    #[serde(rename = "reservaciones")]
    pub reservations: u32,
    /// Capacity of the class
    #[serde(rename = "capacidad", alias = "lugares")]
    pub capacity: u32,
    /// Waitlist count
    #[serde(rename = "listaEspera", default)]
    pub waitlist: u32,
    /// Courtesy seats
    #[serde(rename = "cortesias", default)]
    pub courtesies: u32,
    /// Paid reservations
    #[serde(rename = "reservasPagadas", default)]
    pub paid_reservations: u32,
    /// Instructor category
    #[serde(rename = "categoria")]
    pub category: InstructorCategory,
}

impl EvaluationContext {
    /// Context with the given reservations and capacity and no waitlist,
    /// courtesies or paid reservations.
    pub fn new(reservations: u32, capacity: u32, category: InstructorCategory) -> Self {
        Self {
            reservations,
            capacity,
            waitlist: 0,
            courtesies: 0,
            paid_reservations: 0,
            category,
        }
    }

    /// Value of a field as a decimal.
    pub fn value(&self, field: ContextField) -> Decimal {
        let raw = match field {
            ContextField::Reservations => self.reservations,
            ContextField::Capacity => self.capacity,
            ContextField::Waitlist => self.waitlist,
            ContextField::Courtesies => self.courtesies,
            ContextField::PaidReservations => self.paid_reservations,
        };
        Decimal::from(raw)
    }

    /// Looks a field up by name. `None` for unknown names.
    pub fn lookup(&self, name: &str) -> Option<Decimal> {
        ContextField::from_name(name).map(|field| self.value(field))
    }
}

/// One scheduled class occurrence (`Clase`) as supplied by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Class id
    pub id: Id,
    /// Instructor who taught the class
    #[serde(rename = "instructorId")]
    pub instructor_id: Id,
    /// Discipline of the class
    #[serde(rename = "disciplinaId")]
    pub discipline_id: Id,
    /// Scheduling period the class belongs to
    #[serde(rename = "periodoId")]
    pub period_id: Id,
    /// Category of the instructor in that period
    #[serde(rename = "categoria")]
    pub category: InstructorCategory,
    /// Total reservations
    #[serde(rename = "reservaciones")]
    pub reservations: u32,
    /// Capacity
    #[serde(rename = "lugares", alias = "capacidad")]
    pub capacity: u32,
    /// Waitlist count
    #[serde(rename = "listaEspera", default)]
    pub waitlist: u32,
    /// Courtesy seats
    #[serde(rename = "cortesias", default)]
    pub courtesies: u32,
    /// Paid reservations
    #[serde(rename = "reservasPagadas", default)]
    pub paid_reservations: u32,
}

impl ClassRecord {
    /// Evaluation context for this class.
    pub fn context(&self) -> EvaluationContext {
        EvaluationContext {
            reservations: self.reservations,
            capacity: self.capacity,
            waitlist: self.waitlist,
            courtesies: self.courtesies,
            paid_reservations: self.paid_reservations,
            category: self.category,
        }
    }
}
