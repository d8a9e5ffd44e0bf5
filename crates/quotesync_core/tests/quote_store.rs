use quotesync_core::db::{open_db, open_db_in_memory};
use quotesync_core::{
    default_quotes, KvRepository, Namespace, Quote, QuoteBook, SqliteKvRepository,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn durable_state_survives_reopen_and_session_state_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotes.sqlite3");

    {
        let repo = SqliteKvRepository::begin_session(open_db(&path).unwrap()).unwrap();
        let mut book = QuoteBook::load(repo);
        assert_eq!(book.quotes(), default_quotes().as_slice());

        book.add_quote("Stay curious.", "Learning").unwrap();
        assert!(book.set_filter("Learning"));
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(
            book.random_quote(&mut rng),
            Some(Quote::new("Stay curious.", "Learning").unwrap())
        );
        assert!(book.last_viewed().is_some());
    }

    let repo = SqliteKvRepository::begin_session(open_db(&path).unwrap()).unwrap();
    let book = QuoteBook::load(repo);
    assert_eq!(book.len(), default_quotes().len() + 1);
    assert_eq!(book.filter(), "Learning");
    assert!(book.last_viewed().is_none());
}

#[test]
fn corrupt_durable_state_is_replaced_with_defaults() {
    let repo = SqliteKvRepository::new(open_db_in_memory().unwrap());
    repo.put(Namespace::Durable, "dqg_quotes_v2", "[{\"text\": 5}]")
        .unwrap();

    let book = QuoteBook::load(repo);
    assert_eq!(book.quotes(), default_quotes().as_slice());

    let stored = book
        .repo()
        .get(Namespace::Durable, "dqg_quotes_v2")
        .unwrap()
        .unwrap();
    let parsed: Vec<Quote> = serde_json::from_str(&stored).unwrap();
    assert_eq!(parsed, default_quotes());
}
