use crate::cli_error::CliError;
use crate::data_store::get_store_from_env;
use crate::data_store::{BookingFilter, EventEaseStore};

/// Print all bookings (or the ones matching the search text) as a table to stdout
pub fn print_booking_list(search: Option<&str>) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let mut filter = BookingFilter::builder();
    if let Some(search) = search {
        filter = filter.search(search);
    }
    let bookings = data_store.get_bookings(filter.build())?;

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec!["id", "date", "venue", "event", "event venue"])
        .add_rows(bookings.into_iter().map(|booking| {
            let event_venue = if booking.event.venue_id == booking.venue.id {
                String::new()
            } else {
                format!("#{}", booking.event.venue_id)
            };
            [
                booking.booking.id.to_string(),
                booking.booking.booking_date.to_string(),
                booking.venue.name,
                booking.event.name,
                event_venue,
            ]
        }));

    println!("{table}");
    Ok(())
}
