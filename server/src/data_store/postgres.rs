use super::{
    models, schema, util, BookingFilter, BookingId, EventEaseStore, EventEaseStoreFacade,
    EventFilter, EventId, StoreError, VenueFilter, VenueId,
};
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::DatabaseErrorKind;

#[derive(Clone)]
pub struct PgDataStore {
    pool: diesel::r2d2::Pool<ConnectionManager<PgConnection>>,
}

impl PgDataStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let connection_manager = ConnectionManager::<PgConnection>::new(database_url);
        Ok(Self {
            pool: diesel::r2d2::Pool::builder()
                .test_on_check_out(true)
                .min_idle(Some(2))
                .build(connection_manager)?,
        })
    }
}

impl EventEaseStore for PgDataStore {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn EventEaseStoreFacade + 'a>, StoreError> {
        Ok(Box::new(PgDataStoreFacade::with_pooled_connection(
            self.pool.get()?,
        )))
    }
}

pub struct PgDataStoreFacade {
    connection: PooledConnection<ConnectionManager<PgConnection>>,
}

impl PgDataStoreFacade {
    pub fn with_pooled_connection(
        connection: PooledConnection<ConnectionManager<PgConnection>>,
    ) -> Self {
        Self { connection }
    }
}

impl EventEaseStoreFacade for PgDataStoreFacade {
    fn get_venues(&mut self, filter: VenueFilter) -> Result<Vec<models::Venue>, StoreError> {
        use schema::venues::dsl::*;

        let mut query = venues
            .select(models::Venue::as_select())
            .order_by((name.asc(), id.asc()))
            .into_boxed();
        if let Some(search) = filter.search {
            let pattern = util::sql_contains_pattern(&search);
            query = query.filter(
                name.ilike(pattern.clone())
                    .or(location.ilike(pattern).assume_not_null()),
            );
        }
        Ok(query.load::<models::Venue>(&mut self.connection)?)
    }

    fn get_venue(&mut self, venue_id: VenueId) -> Result<models::Venue, StoreError> {
        use schema::venues::dsl::*;

        venues
            .filter(id.eq(venue_id))
            .select(models::Venue::as_select())
            .first::<models::Venue>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn venue_exists(&mut self, venue_id: VenueId) -> Result<bool, StoreError> {
        use schema::venues::dsl::*;

        Ok(diesel::select(exists(venues.filter(id.eq(venue_id))))
            .get_result::<bool>(&mut self.connection)?)
    }

    fn create_venue(&mut self, venue: models::NewVenue) -> Result<models::Venue, StoreError> {
        use schema::venues::dsl::*;

        Ok(diesel::insert_into(venues)
            .values(&venue)
            .returning(models::Venue::as_returning())
            .get_result::<models::Venue>(&mut self.connection)?)
    }

    fn update_venue(
        &mut self,
        venue_id: VenueId,
        venue: models::NewVenue,
        expected_last_update: Option<DateTime<Utc>>,
    ) -> Result<models::Venue, StoreError> {
        use schema::venues::dsl::*;

        self.connection.transaction(|connection| {
            if let Some(expected_last_update) = expected_last_update {
                let actual_last_update = venues
                    .filter(id.eq(venue_id))
                    .select(last_updated)
                    .for_update()
                    .first::<DateTime<Utc>>(connection)?;
                if expected_last_update != actual_last_update {
                    return Err(StoreError::ConcurrentEditConflict);
                }
            }

            Ok(diesel::update(venues)
                .filter(id.eq(venue_id))
                .set((&venue, last_updated.eq(Utc::now())))
                .returning(models::Venue::as_returning())
                .get_result::<models::Venue>(connection)?)
        })
    }

    fn set_venue_image(
        &mut self,
        venue_id: VenueId,
        new_image_url: &str,
    ) -> Result<models::Venue, StoreError> {
        use schema::venues::dsl::*;

        Ok(diesel::update(venues)
            .filter(id.eq(venue_id))
            .set((image_url.eq(new_image_url), last_updated.eq(Utc::now())))
            .returning(models::Venue::as_returning())
            .get_result::<models::Venue>(&mut self.connection)?)
    }

    fn delete_venue(&mut self, venue_id: VenueId) -> Result<(), StoreError> {
        use schema::venues::dsl::*;

        // Events of the venue are removed by the database (ON DELETE CASCADE). Bookings of the
        // venue or of these events make the statement fail (ON DELETE RESTRICT).
        let count = diesel::delete(venues.filter(id.eq(venue_id)))
            .execute(&mut self.connection)
            .map_err(map_delete_error)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_events(&mut self, filter: EventFilter) -> Result<Vec<models::FullEvent>, StoreError> {
        use schema::{events, venues};

        let mut query = events::table
            .inner_join(venues::table)
            .select((models::Event::as_select(), models::Venue::as_select()))
            .order_by((events::event_date.asc(), events::id.asc()))
            .into_boxed();
        if let Some(venue_id) = filter.venue {
            query = query.filter(events::venue_id.eq(venue_id));
        }
        if let Some(search) = filter.search {
            let pattern = util::sql_contains_pattern(&search);
            query = query.filter(
                events::name
                    .ilike(pattern.clone())
                    .or(events::description
                        .ilike(pattern.clone())
                        .assume_not_null())
                    .or(venues::name.ilike(pattern)),
            );
        }

        Ok(query
            .load::<(models::Event, models::Venue)>(&mut self.connection)?
            .into_iter()
            .map(|(event, venue)| models::FullEvent { event, venue })
            .collect())
    }

    fn get_event(&mut self, event_id: EventId) -> Result<models::FullEvent, StoreError> {
        load_full_event(event_id, &mut self.connection)
    }

    fn event_exists(&mut self, event_id: EventId) -> Result<bool, StoreError> {
        use schema::events::dsl::*;

        Ok(diesel::select(exists(events.filter(id.eq(event_id))))
            .get_result::<bool>(&mut self.connection)?)
    }

    fn create_event(&mut self, event: models::NewEvent) -> Result<models::FullEvent, StoreError> {
        use schema::events::dsl::*;

        self.connection.transaction(|connection| {
            let event_id = diesel::insert_into(events)
                .values(&event)
                .returning(id)
                .get_result::<EventId>(connection)?;
            load_full_event(event_id, connection)
        })
    }

    fn update_event(
        &mut self,
        event_id: EventId,
        event: models::NewEvent,
        expected_last_update: Option<DateTime<Utc>>,
    ) -> Result<models::FullEvent, StoreError> {
        use schema::events::dsl::*;

        self.connection.transaction(|connection| {
            if let Some(expected_last_update) = expected_last_update {
                let actual_last_update = events
                    .filter(id.eq(event_id))
                    .select(last_updated)
                    .for_update()
                    .first::<DateTime<Utc>>(connection)?;
                if expected_last_update != actual_last_update {
                    return Err(StoreError::ConcurrentEditConflict);
                }
            }

            let count = diesel::update(events)
                .filter(id.eq(event_id))
                .set((&event, last_updated.eq(Utc::now())))
                .execute(connection)?;
            if count == 0 {
                return Err(StoreError::NotExisting);
            }
            load_full_event(event_id, connection)
        })
    }

    fn delete_event(&mut self, event_id: EventId) -> Result<(), StoreError> {
        use schema::events::dsl::*;

        let count = diesel::delete(events.filter(id.eq(event_id)))
            .execute(&mut self.connection)
            .map_err(map_delete_error)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_bookings(
        &mut self,
        filter: BookingFilter,
    ) -> Result<Vec<models::FullBooking>, StoreError> {
        use schema::{bookings, events, venues};

        // The booked venue is joined explicitly, since the event's venue may be a different one
        let mut query = bookings::table
            .inner_join(events::table)
            .inner_join(venues::table.on(venues::id.eq(bookings::venue_id)))
            .select((
                models::Booking::as_select(),
                models::Event::as_select(),
                models::Venue::as_select(),
            ))
            .order_by((bookings::booking_date.asc(), bookings::id.asc()))
            .into_boxed();
        if let Some(venue_id) = filter.venue {
            query = query.filter(bookings::venue_id.eq(venue_id));
        }
        if let Some(event_id) = filter.event {
            query = query.filter(bookings::event_id.eq(event_id));
        }
        if let Some(venue_id) = filter.involving_venue {
            query = query.filter(
                bookings::venue_id
                    .eq(venue_id)
                    .or(events::venue_id.eq(venue_id)),
            );
        }
        if let Some(date) = filter.date {
            query = query.filter(bookings::booking_date.eq(date));
        }
        if let Some(booking_id) = filter.exclude {
            query = query.filter(bookings::id.ne(booking_id));
        }
        if let Some(search) = filter.search {
            let pattern = util::sql_contains_pattern(&search);
            query = query.filter(
                events::name
                    .ilike(pattern.clone())
                    .or(venues::name.ilike(pattern.clone()))
                    .or(booking_date_text().like(pattern)),
            );
        }

        Ok(query
            .load::<(models::Booking, models::Event, models::Venue)>(&mut self.connection)?
            .into_iter()
            .map(|(booking, event, venue)| models::FullBooking {
                booking,
                event,
                venue,
            })
            .collect())
    }

    fn get_booking(&mut self, booking_id: BookingId) -> Result<models::FullBooking, StoreError> {
        load_full_booking(booking_id, &mut self.connection)
    }

    fn create_booking(
        &mut self,
        booking: models::NewBooking,
    ) -> Result<models::FullBooking, StoreError> {
        use schema::bookings::dsl::*;

        // A double booking is refused by the unique constraint on (venue_id, booking_date),
        // resulting in StoreError::ConflictEntityExists
        self.connection.transaction(|connection| {
            let booking_id = diesel::insert_into(bookings)
                .values(&booking)
                .returning(id)
                .get_result::<BookingId>(connection)?;
            load_full_booking(booking_id, connection)
        })
    }

    fn update_booking(
        &mut self,
        booking_id: BookingId,
        booking: models::NewBooking,
        expected_last_update: Option<DateTime<Utc>>,
    ) -> Result<models::FullBooking, StoreError> {
        use schema::bookings::dsl::*;

        self.connection.transaction(|connection| {
            if let Some(expected_last_update) = expected_last_update {
                let actual_last_update = bookings
                    .filter(id.eq(booking_id))
                    .select(last_updated)
                    .for_update()
                    .first::<DateTime<Utc>>(connection)?;
                if expected_last_update != actual_last_update {
                    return Err(StoreError::ConcurrentEditConflict);
                }
            }

            let count = diesel::update(bookings)
                .filter(id.eq(booking_id))
                .set((&booking, last_updated.eq(Utc::now())))
                .execute(connection)?;
            if count == 0 {
                return Err(StoreError::NotExisting);
            }
            load_full_booking(booking_id, connection)
        })
    }
}

fn load_full_event(
    event_id: EventId,
    connection: &mut PgConnection,
) -> Result<models::FullEvent, StoreError> {
    use schema::{events, venues};

    let (event, venue) = events::table
        .inner_join(venues::table)
        .filter(events::id.eq(event_id))
        .select((models::Event::as_select(), models::Venue::as_select()))
        .first::<(models::Event, models::Venue)>(connection)?;
    Ok(models::FullEvent { event, venue })
}

fn load_full_booking(
    booking_id: BookingId,
    connection: &mut PgConnection,
) -> Result<models::FullBooking, StoreError> {
    use schema::{bookings, events, venues};

    let (booking, event, venue) = bookings::table
        .inner_join(events::table)
        .inner_join(venues::table.on(venues::id.eq(bookings::venue_id)))
        .filter(bookings::id.eq(booking_id))
        .select((
            models::Booking::as_select(),
            models::Event::as_select(),
            models::Venue::as_select(),
        ))
        .first::<(models::Booking, models::Event, models::Venue)>(connection)?;
    Ok(models::FullBooking {
        booking,
        event,
        venue,
    })
}

/// Map errors of DELETE statements, where a foreign key violation means that the record is still
/// referenced by bookings
fn map_delete_error(error: diesel::result::Error) -> StoreError {
    match error {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            StoreError::StillReferenced
        }
        e => e.into(),
    }
}

/// The booking date as ISO text (YYYY-MM-DD), independent of the session's DateStyle
fn booking_date_text() -> diesel::expression::SqlLiteral<diesel::sql_types::Text> {
    diesel::dsl::sql::<diesel::sql_types::Text>("to_char(bookings.booking_date, 'YYYY-MM-DD')")
}
