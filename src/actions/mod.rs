//! Named operations exposed on the [`Client`](crate::client::Client),
//! grouped by namespace. Each action builds its request parameters, runs the
//! call through the transport, and pushes the raw result through the chain's
//! resolved formatters.

mod public;
