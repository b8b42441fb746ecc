//! Population-level counts.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use super::generations::classify;
use crate::error::Result;
use crate::people::{Gender, Person, PersonFilter, PersonRepository};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyStatistics {
    pub total_people: usize,
    pub total_houses: usize,
    pub generations: usize,
    pub living_members: usize,
    pub deceased_members: usize,
    /// Always exactly `male` and `female`; other genders are not tallied.
    pub gender_count: BTreeMap<String, usize>,
    /// Living members with a known birth date, by age bracket.
    pub age_distribution: BTreeMap<String, usize>,
}

const AGE_BRACKETS: [(&str, u32); 4] = [("0-17", 0), ("18-34", 18), ("35-64", 35), ("65+", 65)];

pub fn aggregate<R: PersonRepository + ?Sized>(repo: &R, generation_depth: usize) -> Result<FamilyStatistics> {
    aggregate_as_of(repo, generation_depth, Utc::now().date_naive())
}

/// [`aggregate`] with ages measured on `today`. Every repository failure is fatal.
pub fn aggregate_as_of<R: PersonRepository + ?Sized>(
    repo: &R,
    generation_depth: usize,
    today: NaiveDate,
) -> Result<FamilyStatistics> {
    let total_people = repo.count_where(PersonFilter::All)?;
    let living_members = repo.count_where(PersonFilter::Living)?;
    let total_houses = repo.distinct_surnames()?.len();
    let generations = classify(repo, generation_depth)?.len();

    let mut gender_count = BTreeMap::new();
    gender_count.insert(
        Gender::Male.as_str().to_string(),
        repo.count_where(PersonFilter::Gender(Gender::Male))?,
    );
    gender_count.insert(
        Gender::Female.as_str().to_string(),
        repo.count_where(PersonFilter::Gender(Gender::Female))?,
    );

    let age_distribution = age_distribution(&repo.all()?, today);

    Ok(FamilyStatistics {
        total_people,
        total_houses,
        generations,
        living_members,
        deceased_members: total_people.saturating_sub(living_members),
        gender_count,
        age_distribution,
    })
}

fn age_distribution(people: &[Person], today: NaiveDate) -> BTreeMap<String, usize> {
    let mut distribution: BTreeMap<String, usize> = AGE_BRACKETS
        .iter()
        .map(|(label, _)| (label.to_string(), 0))
        .collect();

    for person in people.iter().filter(|p| !p.is_deceased()) {
        let Some(age) = person.birth_date.and_then(|birth| completed_years(birth, today)) else {
            continue;
        };
        if let Some((label, _)) = AGE_BRACKETS.iter().rev().find(|(_, min)| age >= *min) {
            *distribution.entry(label.to_string()).or_default() += 1;
        }
    }
    distribution
}

/// Whole years from `birth` to `today`; `None` for birth dates in the future.
fn completed_years(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::testing::FlakyRepository;
    use crate::people::testing::{date, person, with_gender};
    use crate::people::PersonGraph;

    fn population() -> Vec<Person> {
        let mut grandpa = with_gender(person(1, "Tytos", "Lannister", None, None), Gender::Male);
        grandpa.birth_date = Some(date(1930, 5, 1));
        grandpa.death_date = Some(date(2000, 1, 1));
        let mut tywin = with_gender(person(2, "Tywin", "Lannister", Some(1), None), Gender::Male);
        tywin.birth_date = Some(date(1955, 6, 15));
        let mut joanna = with_gender(person(3, "Joanna", "Lannister", None, None), Gender::Female);
        joanna.birth_date = Some(date(1960, 1, 1));
        joanna.death_date = Some(date(1990, 1, 1));
        let mut cersei = with_gender(person(4, "Cersei", "Lannister", Some(2), Some(3)), Gender::Female);
        cersei.birth_date = Some(date(1990, 6, 16));
        let mut joffrey = person(5, "Joffrey", "Baratheon", None, Some(4));
        joffrey.birth_date = Some(date(2010, 1, 1));
        let unknown_age = person(6, "Ser", "Pounce", None, None);
        vec![grandpa, tywin, joanna, cersei, joffrey, unknown_age]
    }

    #[test]
    fn test_aggregate_counts() {
        let graph = PersonGraph::new(population());
        let stats = aggregate_as_of(&graph, 3, date(2024, 6, 15)).unwrap();

        assert_eq!(stats.total_people, 6);
        assert_eq!(stats.living_members, 4);
        assert_eq!(stats.deceased_members, 2);
        assert_eq!(stats.total_houses, 3);
        assert_eq!(stats.generations, 3);
        assert_eq!(stats.gender_count["male"], 2);
        assert_eq!(stats.gender_count["female"], 2);
        assert_eq!(stats.gender_count.len(), 2);
    }

    #[test]
    fn test_invariants() {
        let graph = PersonGraph::new(population());
        let stats = aggregate_as_of(&graph, 3, date(2024, 6, 15)).unwrap();
        assert_eq!(stats.living_members + stats.deceased_members, stats.total_people);
        // Joffrey and Ser Pounce have no recorded gender
        assert!(stats.gender_count.values().sum::<usize>() < stats.total_people);
    }

    #[test]
    fn test_age_distribution() {
        let graph = PersonGraph::new(population());
        let stats = aggregate_as_of(&graph, 3, date(2024, 6, 15)).unwrap();
        // Tywin 69, Cersei turns 34 tomorrow, Joffrey 14; the dead and the undated are skipped
        assert_eq!(stats.age_distribution["65+"], 1);
        assert_eq!(stats.age_distribution["18-34"], 1);
        assert_eq!(stats.age_distribution["0-17"], 1);
        assert_eq!(stats.age_distribution["35-64"], 0);
    }

    #[test]
    fn test_completed_years() {
        assert_eq!(completed_years(date(2000, 3, 1), date(2024, 2, 29)), Some(23));
        assert_eq!(completed_years(date(2000, 3, 1), date(2024, 3, 1)), Some(24));
        assert_eq!(completed_years(date(2030, 1, 1), date(2024, 1, 1)), None);
    }

    #[test]
    fn test_empty_population() {
        let stats = aggregate_as_of(&PersonGraph::default(), 3, date(2024, 1, 1)).unwrap();
        assert_eq!(stats.total_people, 0);
        assert_eq!(stats.generations, 0);
        assert_eq!(stats.gender_count["male"], 0);
    }

    #[test]
    fn test_scan_failure_is_fatal() {
        let mut repo = FlakyRepository::new(population());
        repo.fail_scans = true;
        assert!(aggregate(&repo, 3).is_err());
    }
}
