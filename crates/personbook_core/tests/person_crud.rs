use personbook_core::{
    Passphrase, Person, PersonQuery, PersonRepository, PersonService, PersonStore, SalaryStats,
    SqlitePersonRepository, StoreConfig,
};
use std::collections::HashSet;

fn memory_repo() -> SqlitePersonRepository {
    let store = PersonStore::open(&StoreConfig::in_memory(Passphrase::new("crud").unwrap())).unwrap();
    SqlitePersonRepository::new(store)
}

fn ann() -> Person {
    Person::new("Ann", "Lee", "ann@x.com", "555-0100", 34)
        .with_address("1 Elm St")
        .with_salary(50_000.0)
}

fn bob() -> Person {
    Person::new("Bob", "Lee", "bob@x.com", "555-0101", 41).with_salary(70_000.0)
}

fn stamped(person: Person, created_at: i64) -> Person {
    Person {
        created_at,
        updated_at: created_at,
        ..person
    }
}

#[test]
fn insert_and_get_roundtrip() {
    let repo = memory_repo();
    let original = ann();

    let id = repo.insert(&original).unwrap();
    assert!(id > 0);

    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert!(loaded.created_at > 0);
    assert!(loaded.updated_at >= loaded.created_at);
    assert_eq!(
        Person {
            id: 0,
            created_at: 0,
            updated_at: 0,
            ..loaded
        },
        original
    );
}

#[test]
fn insert_assigns_distinct_ids() {
    let repo = memory_repo();
    let first = repo.insert(&ann()).unwrap();
    let second = repo.insert(&ann()).unwrap();

    assert_ne!(first, second);
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn insert_with_explicit_duplicate_id_replaces_row() {
    let repo = memory_repo();
    let id = repo.insert(&ann()).unwrap();
    repo.insert(&bob()).unwrap();

    let replacement = Person {
        id,
        first_name: "Annabel".to_string(),
        ..ann()
    };
    let returned = repo.insert(&replacement).unwrap();

    assert_eq!(returned, id);
    assert_eq!(repo.count().unwrap(), 2);
    assert_eq!(repo.get_by_id(id).unwrap().unwrap().first_name, "Annabel");
}

#[test]
fn upsert_keeps_original_created_at() {
    let repo = memory_repo();
    let id = repo.insert(&stamped(ann(), 1_000)).unwrap();

    let unset = Person {
        id,
        first_name: "Annabel".to_string(),
        ..ann()
    };
    assert_eq!(unset.created_at, 0);
    repo.insert(&unset).unwrap();
    let after_unset = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(after_unset.created_at, 1_000);
    assert!(after_unset.updated_at > 1_000);
    assert_eq!(after_unset.first_name, "Annabel");

    repo.insert(&stamped(Person { id, ..ann() }, 5)).unwrap();
    let after_stamped = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(after_stamped.created_at, 1_000);
    assert!(after_stamped.updated_at >= after_stamped.created_at);
}

#[test]
fn update_changes_fields_and_updated_at_only() {
    let repo = memory_repo();
    let id = repo.insert(&stamped(ann(), 1_000)).unwrap();
    let before = repo.get_by_id(id).unwrap().unwrap();

    let edited = Person {
        email: "ann.lee@x.com".to_string(),
        ..before.clone()
    };
    assert_eq!(repo.update(&edited).unwrap(), 1);

    let after = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.created_at, 1_000);
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.email, "ann.lee@x.com");
    assert_eq!(
        Person {
            email: before.email.clone(),
            updated_at: before.updated_at,
            ..after
        },
        before
    );
}

#[test]
fn update_ignores_caller_created_at() {
    let repo = memory_repo();
    let id = repo.insert(&stamped(ann(), 1_000)).unwrap();
    let mut edited = repo.get_by_id(id).unwrap().unwrap();
    edited.created_at = 42;

    repo.update(&edited).unwrap();

    assert_eq!(repo.get_by_id(id).unwrap().unwrap().created_at, 1_000);
}

#[test]
fn update_missing_id_affects_zero_rows() {
    let repo = memory_repo();
    repo.insert(&ann()).unwrap();

    let ghost = Person { id: 9_999, ..bob() };
    assert_eq!(repo.update(&ghost).unwrap(), 0);
    assert_eq!(repo.count().unwrap(), 1);
    assert!(repo.get_by_id(9_999).unwrap().is_none());
}

#[test]
fn delete_semantics() {
    let repo = memory_repo();
    let ann_id = repo.insert(&ann()).unwrap();
    let bob_id = repo.insert(&bob()).unwrap();

    assert_eq!(repo.delete_by_id(12_345).unwrap(), 0);
    assert_eq!(repo.count().unwrap(), 2);

    let stored_ann = repo.get_by_id(ann_id).unwrap().unwrap();
    assert_eq!(repo.delete(&stored_ann).unwrap(), 1);
    assert_eq!(repo.delete(&stored_ann).unwrap(), 0);
    assert!(repo.get_by_id(ann_id).unwrap().is_none());
    assert!(repo.get_by_id(bob_id).unwrap().is_some());

    repo.insert(&ann()).unwrap();
    assert_eq!(repo.delete_all().unwrap(), 2);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn aggregates_on_empty_table_are_zero() {
    let repo = memory_repo();

    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(repo.average_salary().unwrap(), 0.0);
    assert_eq!(repo.max_salary().unwrap(), 0.0);
    assert_eq!(repo.min_salary().unwrap(), 0.0);
    assert_eq!(repo.salary_stats().unwrap(), SalaryStats::default());
}

#[test]
fn all_is_ordered_newest_first() {
    let repo = memory_repo();
    let oldest = repo.insert(&stamped(ann(), 1_000)).unwrap();
    let newest = repo.insert(&stamped(bob(), 3_000)).unwrap();
    let middle = repo
        .insert(&stamped(
            Person::new("Cy", "Ng", "cy@x.com", "3", 22),
            2_000,
        ))
        .unwrap();

    let ids: Vec<_> = repo
        .list(&PersonQuery::All)
        .unwrap()
        .into_iter()
        .map(|person| person.id)
        .collect();
    assert_eq!(ids, vec![newest, middle, oldest]);
}

#[test]
fn equal_created_at_lists_are_stable_across_reads() {
    let repo = memory_repo();
    for _ in 0..4 {
        repo.insert(&stamped(ann(), 5_000)).unwrap();
    }

    let first = repo.list(&PersonQuery::All).unwrap();
    let second = repo.list(&PersonQuery::All).unwrap();
    assert_eq!(first, second);
}

#[test]
fn search_matches_first_last_or_email_case_sensitively() {
    let repo = memory_repo();
    let people = [
        Person::new("Ann", "Lee", "ann@x.com", "1", 30),
        Person::new("Bob", "Leeds", "bob@y.org", "2", 31),
        Person::new("Cara", "Moss", "cara@lee.net", "3", 32),
        Person::new("Dan", "Ray", "dan@x.com", "4", 33).with_address("Lee Street"),
        Person::new("lee", "lowercase", "l@x.com", "5", 34),
    ];
    for person in &people {
        repo.insert(person).unwrap();
    }

    for needle in ["Lee", "lee", "x.com", "@", "nobody", " "] {
        let expected: HashSet<String> = people
            .iter()
            .filter(|person| {
                person.first_name.contains(needle)
                    || person.last_name.contains(needle)
                    || person.email.contains(needle)
            })
            .map(|person| person.email.clone())
            .collect();
        let actual: HashSet<String> = repo
            .list(&PersonQuery::search(needle))
            .unwrap()
            .into_iter()
            .map(|person| person.email)
            .collect();
        assert_eq!(actual, expected, "search `{needle}`");
    }

    assert_eq!(
        repo.list(&PersonQuery::search("")).unwrap(),
        repo.list(&PersonQuery::All).unwrap()
    );
}

#[test]
fn salary_orderings_and_minimum_filter() {
    let repo = memory_repo();
    repo.insert(&ann()).unwrap();
    repo.insert(&bob()).unwrap();
    repo.insert(&Person::new("Cy", "Ng", "cy@x.com", "3", 22).with_salary(60_000.0))
        .unwrap();

    let by_salary: Vec<f64> = repo
        .list(&PersonQuery::BySalary)
        .unwrap()
        .into_iter()
        .map(|person| person.salary)
        .collect();
    assert_eq!(by_salary, vec![70_000.0, 60_000.0, 50_000.0]);

    let at_least: Vec<String> = repo
        .list(&PersonQuery::MinSalary(60_000.0))
        .unwrap()
        .into_iter()
        .map(|person| person.first_name)
        .collect();
    assert_eq!(at_least, vec!["Bob", "Cy"]);
}

#[test]
fn ann_and_bob_scenario_through_service() {
    let repo = memory_repo();
    let service = PersonService::new(repo);

    let ann_id = service.insert(&ann()).unwrap();
    let bob_id = service.insert(&bob()).unwrap();

    let lees: Vec<_> = service
        .list(&PersonQuery::search("Lee"))
        .unwrap()
        .into_iter()
        .map(|person| person.id)
        .collect();
    assert_eq!(lees, vec![bob_id, ann_id]);

    let by_salary: Vec<_> = service
        .list(&PersonQuery::BySalary)
        .unwrap()
        .into_iter()
        .map(|person| person.first_name)
        .collect();
    assert_eq!(by_salary, vec!["Bob", "Ann"]);

    assert_eq!(service.average_salary().unwrap(), 60_000.0);
    assert_eq!(service.max_salary().unwrap(), 70_000.0);
    assert_eq!(service.min_salary().unwrap(), 50_000.0);
    assert_eq!(service.count().unwrap(), 2);
}
