//! Clients for hosted services.

pub mod supabase;
