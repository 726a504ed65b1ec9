use hashbrown::HashMap;

use crate::error::{Error, Result};
use crate::models::{AddressRecord, Client, OutputRow};

/// Join address records onto their clients by `client_id`.
///
/// Output follows the order of `records`. An address whose client is not in
/// `clients` is an error.
pub fn join_rows(clients: &[Client], records: &[AddressRecord]) -> Result<Vec<OutputRow>> {
    let by_id: HashMap<&str, &Client> = clients
        .iter()
        .map(|client| (client.client_id.as_str(), client))
        .collect();

    records
        .iter()
        .map(|record| {
            by_id
                .get(record.client_id.as_str())
                .map(|client| OutputRow::join(client, record))
                .ok_or_else(|| Error::UnknownClient(record.client_id.clone()))
        })
        .collect()
}
