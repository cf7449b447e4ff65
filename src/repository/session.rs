use super::context::SessionContext;
use super::entity::EntityRepository;
use crate::config::DataConfig;
use crate::core::{ConfigError, Result};
use crate::model::{Deck, Flashcard, SessionSummary, Subdeck};
use crate::query::Predicate;
use crate::remote::RemoteStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Level, event};

/// A store that serves every entity kind of the app.
pub trait DataStore:
    RemoteStore<Deck>
    + RemoteStore<Subdeck>
    + RemoteStore<Flashcard>
    + RemoteStore<SessionSummary>
    + 'static
{
}

impl<S> DataStore for S where
    S: RemoteStore<Deck>
        + RemoteStore<Subdeck>
        + RemoteStore<Flashcard>
        + RemoteStore<SessionSummary>
        + 'static
{
}

/// All repositories of one signed-in user.
///
/// Scoped repositories (subdecks of a deck, flashcards of a deck) are built
/// on first access and kept until sign-out.
///
/// # Examples
///
/// ```
/// use deckstore::{DataConfig, DataSession, Deck, InMemoryBackend, PartitionKey, SessionContext};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let backend = Arc::new(InMemoryBackend::new(10));
/// backend.decks.put(Deck::new("alice", "Spanish")).await;
///
/// let owner = PartitionKey::new("alice").unwrap();
/// let session = DataSession::new(SessionContext::new(owner, backend), DataConfig::default()).unwrap();
/// let decks = session.decks().refresh().await.unwrap();
/// assert_eq!(decks.len(), 1);
/// # });
/// ```
pub struct DataSession<S: ?Sized> {
    context: SessionContext<S>,
    config: DataConfig,
    decks: EntityRepository<Deck, S>,
    session_summaries: EntityRepository<SessionSummary, S>,
    subdecks: Mutex<HashMap<String, Arc<EntityRepository<Subdeck, S>>>>,
    flashcards: Mutex<HashMap<String, Arc<EntityRepository<Flashcard, S>>>>,
}

impl<S: DataStore + ?Sized> DataSession<S> {
    pub fn new(context: SessionContext<S>, config: DataConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let decks = EntityRepository::new(&context, &config.decks, config.page_size);
        let session_summaries =
            EntityRepository::new(&context, &config.session_summaries, config.page_size);
        Ok(Self {
            context,
            config,
            decks,
            session_summaries,
            subdecks: Mutex::new(HashMap::new()),
            flashcards: Mutex::new(HashMap::new()),
        })
    }

    pub fn context(&self) -> &SessionContext<S> {
        &self.context
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    pub fn decks(&self) -> &EntityRepository<Deck, S> {
        &self.decks
    }

    pub fn session_summaries(&self) -> &EntityRepository<SessionSummary, S> {
        &self.session_summaries
    }

    /// Repository of the subdecks whose `parent_id` is `deck_id`.
    pub async fn subdecks_of(&self, deck_id: &str) -> Arc<EntityRepository<Subdeck, S>> {
        let mut repos = self.subdecks.lock().await;
        repos
            .entry(deck_id.to_string())
            .or_insert_with(|| {
                Arc::new(EntityRepository::scoped(
                    &self.context,
                    &self.config.subdecks,
                    self.config.page_size,
                    vec![Predicate::equals("parent_id", deck_id)],
                ))
            })
            .clone()
    }

    /// Repository of the flashcards filed under `deck_id`.
    pub async fn flashcards_of(&self, deck_id: &str) -> Arc<EntityRepository<Flashcard, S>> {
        let mut repos = self.flashcards.lock().await;
        repos
            .entry(deck_id.to_string())
            .or_insert_with(|| {
                Arc::new(EntityRepository::scoped(
                    &self.context,
                    &self.config.flashcards,
                    self.config.page_size,
                    vec![Predicate::equals("deck_id", deck_id)],
                ))
            })
            .clone()
    }

    /// Resolves a deck's `subdeck_ids` into subdecks, in the deck's order.
    pub async fn resolve_subdecks(&self, deck: &Deck) -> Result<Vec<Subdeck>> {
        self.subdecks_of(&deck.id)
            .await
            .lookup_ids(&deck.subdeck_ids)
            .await
    }

    /// Resolves a subdeck's parent through a point lookup.
    pub async fn parent_of(&self, subdeck: &Subdeck) -> Result<Option<Deck>> {
        self.decks.get(&subdeck.parent_id).await
    }

    /// Cancels in-flight loops and clears every cache.
    pub async fn sign_out(&self) {
        self.context.cancel();
        self.decks.reset().await;
        self.session_summaries.reset().await;

        let subdecks: Vec<_> = self.subdecks.lock().await.drain().map(|(_, r)| r).collect();
        for repo in subdecks {
            repo.reset().await;
        }
        let flashcards: Vec<_> = self.flashcards.lock().await.drain().map(|(_, r)| r).collect();
        for repo in flashcards {
            repo.reset().await;
        }
        event!(Level::INFO, partition = %self.context.partition(), "session signed out");
    }
}
