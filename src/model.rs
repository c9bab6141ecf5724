//! Example domain entities stored by the demo
//!
//! Both records are immutable once built and carry their own binary layout.

use crate::binary::{BinaryEnumType, BinaryObject, BinaryObjectBuilder, BinaryType};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fmt;

/// Postal address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    street: String,
    zip: i32,
}

impl Address {
    pub fn new(street: impl Into<String>, zip: i32) -> Self {
        Self {
            street: street.into(),
            zip,
        }
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn zip(&self) -> i32 {
        self.zip
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address [street={}, zip={}]", self.street, self.zip)
    }
}

impl BinaryType for Address {
    const TYPE_NAME: &'static str = "Address";

    fn write_binary(&self, builder: &mut BinaryObjectBuilder) {
        builder
            .set_field("street", self.street.as_str())
            .set_field("zip", self.zip);
    }

    fn read_binary(object: &BinaryObject) -> Result<Self> {
        Ok(Self {
            street: object.field_as("street")?,
            zip: object.field_as("zip")?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrganizationType {
    Private,
    State,
    NonProfit,
}

impl BinaryEnumType for OrganizationType {
    const TYPE_NAME: &'static str = "OrganizationType";

    fn ordinal(&self) -> i32 {
        match self {
            OrganizationType::Private => 0,
            OrganizationType::State => 1,
            OrganizationType::NonProfit => 2,
        }
    }

    fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(OrganizationType::Private),
            1 => Some(OrganizationType::State),
            2 => Some(OrganizationType::NonProfit),
            _ => None,
        }
    }
}

impl fmt::Display for OrganizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrganizationType::Private => "Private",
            OrganizationType::State => "State",
            OrganizationType::NonProfit => "NonProfit",
        };
        f.write_str(name)
    }
}

/// Organization record used as a cache value
#[derive(Clone, Debug, PartialEq)]
pub struct Organization {
    name: String,
    address: Address,
    org_type: OrganizationType,
    last_updated: DateTime<Utc>,
}

impl Organization {
    pub fn new(
        name: impl Into<String>,
        address: Address,
        org_type: OrganizationType,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            org_type,
            last_updated,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn org_type(&self) -> OrganizationType {
        self.org_type
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Organization [name={}, address={}, type={}, lastUpdated={}]",
            self.name,
            self.address,
            self.org_type,
            self.last_updated.to_rfc3339()
        )
    }
}

impl BinaryType for Organization {
    const TYPE_NAME: &'static str = "Organization";

    fn write_binary(&self, builder: &mut BinaryObjectBuilder) {
        builder
            .set_field("name", self.name.as_str())
            .set_object("address", &self.address)
            .set_enum("type", &self.org_type)
            .set_field("lastUpdated", self.last_updated);
    }

    fn read_binary(object: &BinaryObject) -> Result<Self> {
        Ok(Self {
            name: object.field_as("name")?,
            address: object.field_object("address")?,
            org_type: object.field_enum("type")?,
            last_updated: object.field_as("lastUpdated")?,
        })
    }
}
