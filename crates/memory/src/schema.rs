//! Table definitions for the memory subsystem (§6 Persistence), following the keyspace/
//! clustering-key conventions already used elsewhere in this codebase's ScyllaDB layer.

use scylla::Session;

use crate::error::MemoryError;

pub async fn create_keyspace(session: &Session, keyspace: &str) -> Result<(), MemoryError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} \
         WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
    );
    session.query_unpaged(query, &[]).await?;
    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), MemoryError> {
    // Users: partitioned by telegram id, the natural primary key.
    let users = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.users (
            user_id BIGINT,
            username TEXT,
            first_name TEXT,
            last_name TEXT,
            language TEXT,
            is_allowed BOOLEAN,
            created_at TIMESTAMP,
            updated_at TIMESTAMP,
            PRIMARY KEY (user_id)
        )"
    );
    session.query_unpaged(users, &[]).await?;

    // Profiles: one row per user; sets/maps stored as native collections, custom
    // attributes as a JSON blob since their shape is open-ended.
    let profiles = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.user_profiles (
            user_id BIGINT,
            preferred_name TEXT,
            age INT,
            location TEXT,
            timezone TEXT,
            occupation TEXT,
            languages SET<TEXT>,
            interests SET<TEXT>,
            expertise_areas SET<TEXT>,
            communication_style TEXT,
            custom_attributes_json TEXT,
            PRIMARY KEY (user_id)
        )"
    );
    session.query_unpaged(profiles, &[]).await?;

    // Facts: partitioned by user, clustered on (fact_type, fact_key) so the natural
    // uniqueness constraint is expressed as the clustering key rather than a separate
    // unique index (§6).
    let facts = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.profile_facts (
            user_id BIGINT,
            fact_type TEXT,
            fact_key TEXT,
            fact_id UUID,
            fact_value TEXT,
            confidence FLOAT,
            source TEXT,
            expires_at TIMESTAMP,
            updated_at TIMESTAMP,
            PRIMARY KEY ((user_id), fact_type, fact_key)
        )"
    );
    session.query_unpaged(facts, &[]).await?;

    // Conversation messages: partitioned by session, clustered by id (TIMEUUID-free:
    // the application supplies `created_at` for ordering) descending so "recent first"
    // reads need no reversal.
    let messages = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.conversation_messages (
            session_id TEXT,
            created_at TIMESTAMP,
            message_id UUID,
            user_id BIGINT,
            role TEXT,
            content TEXT,
            agent_type TEXT,
            tokens_used INT,
            processing_time_ms INT,
            PRIMARY KEY ((session_id), created_at, message_id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, message_id DESC)"
    );
    session.query_unpaged(messages, &[]).await?;

    // A secondary, denormalized view keyed by user so `get_recent_messages(user_id, K)`
    // doesn't need a cross-session scan-and-merge.
    let messages_by_user = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.conversation_messages_by_user (
            user_id BIGINT,
            created_at TIMESTAMP,
            message_id UUID,
            session_id TEXT,
            role TEXT,
            content TEXT,
            agent_type TEXT,
            tokens_used INT,
            processing_time_ms INT,
            PRIMARY KEY ((user_id), created_at, message_id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, message_id DESC)"
    );
    session.query_unpaged(messages_by_user, &[]).await?;

    let sessions = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.conversation_sessions (
            session_id TEXT,
            user_id BIGINT,
            started_at TIMESTAMP,
            ended_at TIMESTAMP,
            message_count INT,
            metadata_json TEXT,
            PRIMARY KEY (session_id)
        )"
    );
    session.query_unpaged(sessions, &[]).await?;

    // One row per user pointing at their currently-active session, if any, so
    // `get_or_create_session` doesn't require `ALLOW FILTERING` over `conversation_sessions`.
    let active_sessions = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.active_sessions_by_user (
            user_id BIGINT,
            session_id TEXT,
            PRIMARY KEY (user_id)
        )"
    );
    session.query_unpaged(active_sessions, &[]).await?;

    let extraction_events = format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.memory_extraction_events (
            user_id BIGINT,
            created_at TIMESTAMP,
            event_id UUID,
            facts_extracted INT,
            profile_updated BOOLEAN,
            outcome TEXT,
            PRIMARY KEY ((user_id), created_at, event_id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, event_id DESC)"
    );
    session.query_unpaged(extraction_events, &[]).await?;

    Ok(())
}
