use personbook_core::{
    Passphrase, Person, PersonQuery, PersonRepository, PersonStore, SqlitePersonRepository,
    StoreConfig,
};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn memory_repo() -> SqlitePersonRepository {
    let store = PersonStore::open(&StoreConfig::in_memory(Passphrase::new("live").unwrap())).unwrap();
    SqlitePersonRepository::new(store)
}

fn person(first: &str, last: &str, salary: f64) -> Person {
    Person::new(first, last, format!("{}@x.com", first.to_lowercase()), "1", 30).with_salary(salary)
}

#[tokio::test]
async fn first_emission_is_current_snapshot() {
    let repo = memory_repo();
    repo.insert(&person("Ann", "Lee", 1.0)).unwrap();

    let mut live = repo.observe_all().unwrap();
    let snapshot = tokio::time::timeout(WAIT, live.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(live.query(), &PersonQuery::All);
}

#[tokio::test]
async fn insert_triggers_new_emission_without_resubscribing() {
    let repo = memory_repo();
    let mut live = repo.observe_all().unwrap();
    let initial = live.next().await.unwrap().unwrap();
    assert!(initial.is_empty());

    let id = repo.insert(&person("Ann", "Lee", 1.0)).unwrap();

    let updated = tokio::time::timeout(WAIT, live.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, id);
}

#[tokio::test]
async fn writes_between_polls_coalesce_into_latest_snapshot() {
    let repo = memory_repo();
    let mut live = repo.observe_all().unwrap();
    live.next().await.unwrap().unwrap();

    repo.insert(&person("Ann", "Lee", 1.0)).unwrap();
    repo.insert(&person("Bob", "Lee", 2.0)).unwrap();
    let cy = repo.insert(&person("Cy", "Ng", 3.0)).unwrap();
    repo.delete_by_id(cy).unwrap();

    let snapshot = tokio::time::timeout(WAIT, live.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 2);

    let idle = tokio::time::timeout(Duration::from_millis(200), live.next()).await;
    assert!(idle.is_err(), "no write happened, so no emission expected");
}

#[tokio::test]
async fn no_op_writes_do_not_emit() {
    let repo = memory_repo();
    let mut live = repo.observe_all().unwrap();
    live.next().await.unwrap().unwrap();

    repo.delete_by_id(77).unwrap();
    repo.update(&Person { id: 78, ..person("Ann", "Lee", 1.0) })
        .unwrap();

    let idle = tokio::time::timeout(Duration::from_millis(200), live.next()).await;
    assert!(idle.is_err());
}

#[tokio::test]
async fn search_and_salary_views_stay_filtered() {
    let repo = memory_repo();
    let mut lees = repo.observe_search("Lee").unwrap();
    let mut rich = repo.observe_by_min_salary(60_000.0).unwrap();
    let mut by_salary = repo.observe_by_salary().unwrap();
    lees.next().await.unwrap().unwrap();
    rich.next().await.unwrap().unwrap();
    by_salary.next().await.unwrap().unwrap();

    repo.insert(&person("Ann", "Lee", 50_000.0)).unwrap();
    repo.insert(&person("Bob", "Lee", 70_000.0)).unwrap();
    repo.insert(&person("Cy", "Ng", 65_000.0)).unwrap();

    let lee_names: Vec<_> = lees
        .next()
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|p| p.first_name)
        .collect();
    assert_eq!(lee_names, vec!["Bob", "Ann"]);

    let rich_names: Vec<_> = rich
        .next()
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|p| p.first_name)
        .collect();
    assert_eq!(rich_names, vec!["Bob", "Cy"]);

    let salaries: Vec<_> = by_salary
        .next()
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|p| p.salary)
        .collect();
    assert_eq!(salaries, vec![70_000.0, 65_000.0, 50_000.0]);
}

#[tokio::test]
async fn closing_store_ends_the_stream() {
    let repo = memory_repo();
    let mut live = repo.observe_all().unwrap();
    live.next().await.unwrap().unwrap();

    repo.store().close().unwrap();

    let ended = tokio::time::timeout(WAIT, live.next()).await.unwrap();
    assert!(ended.is_none());
    assert!(repo.observe_all().is_err());
}
