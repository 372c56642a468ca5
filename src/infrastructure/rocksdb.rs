use crate::domain::booking::{Booking, BookingId};
use crate::domain::order::{Order, OrderNumber, Payment};
use crate::domain::ports::{BookingStore, OrderStore};
use crate::domain::status::{BookingStatus, OrderStatus};
use crate::error::{BakeryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing bookings.
pub const CF_BOOKINGS: &str = "bookings";
/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for both `Booking` and `Order` records using separate
/// Column Families. Read-modify-write operations run under a shared write
/// mutex so uniqueness checks and status compare-and-set stay atomic.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("bookings" and "orders") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_bookings = ColumnFamilyDescriptor::new(CF_BOOKINGS, Options::default());
        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_bookings, cf_orders])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value).map_err(|e| {
            BakeryError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )))
        })?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(decode(&value)?);
        }
        Ok(records)
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            BakeryError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        BakeryError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl BookingStore for RocksDBStore {
    async fn insert(&self, booking: Booking) -> Result<Booking> {
        let _guard = self.write_lock.lock().await;
        let key = booking.id.as_bytes();
        if self.exists(CF_BOOKINGS, key)? {
            return Err(BakeryError::DuplicateKey(booking.id.to_string()));
        }
        self.write(CF_BOOKINGS, key, &booking)?;
        Ok(booking)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        self.read(CF_BOOKINGS, id.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Booking>> {
        self.scan(CF_BOOKINGS)
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking> {
        let _guard = self.write_lock.lock().await;
        let mut booking: Booking = self
            .read(CF_BOOKINGS, id.as_bytes())?
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))?;
        if booking.status != expected {
            return Err(BakeryError::Conflict(format!(
                "booking status changed concurrently (expected '{expected}', found '{}')",
                booking.status
            )));
        }
        booking.status = next;
        self.write(CF_BOOKINGS, id.as_bytes(), &booking)?;
        Ok(booking)
    }

    async fn delete(&self, id: BookingId) -> Result<Option<Booking>> {
        let _guard = self.write_lock.lock().await;
        let existing: Option<Booking> = self.read(CF_BOOKINGS, id.as_bytes())?;
        if existing.is_some() {
            let cf = self.cf(CF_BOOKINGS)?;
            self.db.delete_cf(cf, id.as_bytes())?;
        }
        Ok(existing)
    }

    async fn find_due(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>> {
        let mut due: Vec<Booking> = self
            .scan::<Booking>(CF_BOOKINGS)?
            .into_iter()
            .filter(|b| b.delivery_date >= start && b.delivery_date <= end)
            .filter(|b| statuses.contains(&b.status))
            .collect();
        due.sort_by_key(|b| b.delivery_date);
        Ok(due)
    }

    async fn mark_reminded(&self, id: BookingId, on: NaiveDate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut booking: Booking = self
            .read(CF_BOOKINGS, id.as_bytes())?
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))?;
        booking.last_reminder_sent_on = Some(on);
        self.write(CF_BOOKINGS, id.as_bytes(), &booking)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let key = order.order_number.as_str().as_bytes();
        if self.exists(CF_ORDERS, key)? {
            return Err(BakeryError::DuplicateKey(order.order_number.to_string()));
        }
        self.write(CF_ORDERS, key, &order)?;
        Ok(order)
    }

    async fn get(&self, number: &OrderNumber) -> Result<Option<Order>> {
        self.read(CF_ORDERS, number.as_str().as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS)
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let key = number.as_str().as_bytes();
        let mut order: Order = self
            .read(CF_ORDERS, key)?
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))?;
        if order.status != expected {
            return Err(BakeryError::Conflict(format!(
                "order status changed concurrently (expected '{expected}', found '{}')",
                order.status
            )));
        }
        order.status = next;
        self.write(CF_ORDERS, key, &order)?;
        Ok(order)
    }

    async fn update_payment(&self, number: &OrderNumber, payment: Payment) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let key = number.as_str().as_bytes();
        let mut order: Order = self
            .read(CF_ORDERS, key)?
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))?;
        order.payment = payment;
        self.write(CF_ORDERS, key, &order)?;
        Ok(order)
    }
}
