//! Synthetic client profiles drawn from fixed Spanish value tables.

use chrono::{Datelike, Days, Months, NaiveDate};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

use crate::models::{generate_id, Client};

pub const CLIENT_ID_PREFIX: &str = "cus";

const MALE_NAMES: &[&str] = &[
    "Antonio", "Manuel", "José", "Francisco", "David", "Juan", "Javier", "Daniel", "Carlos",
    "Alejandro", "Miguel", "Rafael", "Pablo", "Sergio", "Jorge", "Luis", "Alberto", "Álvaro",
    "Diego", "Adrián", "Fernando", "Raúl", "Iván", "Rubén", "Óscar", "Andrés", "Ramón",
    "Enrique", "Vicente", "Juan Carlos",
];

const FEMALE_NAMES: &[&str] = &[
    "María", "Carmen", "Ana", "Laura", "Isabel", "Cristina", "Lucía", "Marta", "Elena",
    "Paula", "Sara", "Pilar", "Rosa", "Raquel", "Patricia", "Beatriz", "Silvia", "Irene",
    "Nuria", "Alicia", "Andrea", "Sofía", "Teresa", "Eva", "Julia", "Claudia", "Rocío",
    "Inmaculada", "Mercedes", "María José",
];

const LAST_NAMES: &[&str] = &[
    "García", "Rodríguez", "González", "Fernández", "López", "Martínez", "Sánchez", "Pérez",
    "Gómez", "Martín", "Jiménez", "Ruiz", "Hernández", "Díaz", "Moreno", "Muñoz", "Álvarez",
    "Romero", "Alonso", "Gutiérrez", "Navarro", "Torres", "Domínguez", "Vázquez", "Ramos",
    "Gil", "Ramírez", "Serrano", "Blanco", "Molina", "Morales", "Suárez", "Ortega", "Delgado",
    "Castro", "Ortiz", "Rubio", "Marín", "Sanz", "Núñez", "Iglesias", "Medina", "Garrido",
];

const OCCUPATIONS: &[&str] = &[
    "Abogado", "Administrativo", "Arquitecto", "Camarero", "Carpintero", "Contable",
    "Dependiente", "Diseñador gráfico", "Electricista", "Enfermero", "Farmacéutico",
    "Fisioterapeuta", "Fontanero", "Ingeniero de software", "Maestro", "Mecánico", "Médico",
    "Periodista", "Policía", "Profesor", "Psicólogo", "Recepcionista", "Repartidor",
    "Técnico de laboratorio", "Veterinario",
];

const EMAIL_PROVIDERS: &[&str] = &["gmail.com", "outlook.com", "hotmail.com", "yahoo.com"];

const STATUSES: &[(&str, f64)] = &[("active", 0.85), ("unactive", 0.10), ("suspended", 0.05)];

const MIN_AGE_YEARS: u32 = 18;
const MAX_AGE_YEARS: u32 = 90;

/// Generates client rosters relative to a fixed "today"
#[derive(Debug, Clone, Copy)]
pub struct ClientGenerator {
    today: NaiveDate,
}

impl ClientGenerator {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Client> {
        let clients: Vec<Client> = (0..count).map(|_| self.generate_one(rng)).collect();
        info!("Generated {} clients", clients.len());
        clients
    }

    pub fn generate_one<R: Rng + ?Sized>(&self, rng: &mut R) -> Client {
        let is_male = rng.random_bool(0.5);
        let first_name = pick(if is_male { MALE_NAMES } else { FEMALE_NAMES }, rng);
        let last_name = pick(LAST_NAMES, rng);
        let created_at = self.created_at(rng);

        Client {
            client_id: generate_id(CLIENT_ID_PREFIX, rng),
            email: email(first_name, last_name, rng),
            phone_number: phone_number(rng),
            date_of_birth: self.date_of_birth(rng).format("%Y-%m-%d").to_string(),
            gender: if is_male { "Male" } else { "Female" }.to_string(),
            occupation: pick(OCCUPATIONS, rng).to_string(),
            created_at: created_at.format("%Y-%m-%d").to_string(),
            updated_at: self.updated_at(created_at, rng).format("%Y-%m-%d").to_string(),
            status: status(rng).to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }

    fn date_of_birth<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        let youngest = self
            .today
            .checked_sub_months(Months::new(MIN_AGE_YEARS * 12))
            .unwrap_or(self.today);
        let oldest = self
            .today
            .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
            .unwrap_or(youngest);
        date_between(oldest, youngest, rng)
    }

    /// Some day since the start of the current decade, not after today
    fn created_at<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        let decade_start = self.today.year() - self.today.year().rem_euclid(10);
        let start = NaiveDate::from_ymd_opt(decade_start, 1, 1).unwrap_or(self.today);
        date_between(start, self.today, rng)
    }

    /// Within the last year, never before `created_at`
    fn updated_at<R: Rng + ?Sized>(&self, created_at: NaiveDate, rng: &mut R) -> NaiveDate {
        let year_ago = self
            .today
            .checked_sub_months(Months::new(12))
            .unwrap_or(self.today);
        date_between(year_ago.max(created_at), self.today, rng)
    }
}

fn pick<'a, R: Rng + ?Sized>(values: &[&'a str], rng: &mut R) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

fn date_between<R: Rng + ?Sized>(start: NaiveDate, end: NaiveDate, rng: &mut R) -> NaiveDate {
    let span = (end - start).num_days().max(0) as u64;
    start
        .checked_add_days(Days::new(rng.random_range(0..=span)))
        .unwrap_or(start)
}

fn email<R: Rng + ?Sized>(first_name: &str, last_name: &str, rng: &mut R) -> String {
    let clean = |name: &str| name.replace(' ', ".").to_lowercase();
    format!(
        "{}.{}@{}",
        clean(first_name),
        clean(last_name),
        pick(EMAIL_PROVIDERS, rng)
    )
}

/// Spanish mobile or Madrid landline number
fn phone_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = if rng.random_bool(0.7) { "6" } else { "91" };
    let mut digits = String::from(prefix);
    while digits.len() < 9 {
        digits.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
    format!("+34 {} {} {}", &digits[0..3], &digits[3..6], &digits[6..9])
}

fn status<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    STATUSES
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(status, _)| *status)
        .unwrap_or("active")
}
