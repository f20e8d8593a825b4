use std::{fmt, str::FromStr};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{LotteryError, LotteryResult};

pub const PUBKEY_LEN: usize = 32;

pub const AWARD: &str = "award";
pub const FUND: &str = "fund";
pub const PRICE: &str = "price";
pub const FEE: &str = "fee";
pub const OWNER: &str = "owner";
pub const PLAYER_COUNT: &str = "player_count";
pub const PLAYER: &str = "player";
pub const TICKET: &str = "ticket";
pub const RESERVED: &str = "reserved";
pub const AWARD_COUNT: &str = "award_count";
pub const ACCOUNT: &str = "account";
pub const REWARDED: &str = "rewarded";
pub const TIMESTAMP: &str = "timestamp";

/// Historical byte layouts of the pool and billboard accounts.
///
/// The program went through three incompatible revisions. `Current` is the
/// canonical one; the other two are kept so old accounts can still be read.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    /// Fund and owner only, one implicit ticket per player, undated billboard.
    Genesis = 1,
    /// Adds award and price, explicit ticket numbers, dated billboard.
    Priced = 2,
    /// Adds the fee account and a reserved byte per player record.
    #[default]
    Current = 3,
}

impl LayoutVariant {
    pub const CANONICAL: Self = Self::Current;
    pub const ALL: [Self; 3] = [Self::Genesis, Self::Priced, Self::Current];

    pub fn from_tag(tag: u8) -> LotteryResult<Self> {
        Self::try_from(tag).map_err(|_| LotteryError::UnknownLayoutVariant(tag.to_string()))
    }

    pub fn tag(self) -> u8 {
        self.into()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Genesis => "genesis",
            Self::Priced => "priced",
            Self::Current => "current",
        }
    }

    pub fn is_deprecated(self) -> bool {
        self != Self::CANONICAL
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutVariant {
    type Err = LotteryError;

    /// Accepts either the variant name or its numeric tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(tag) = s.parse::<u8>() {
            return Self::from_tag(tag);
        }
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LotteryError::UnknownLayoutVariant(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StructureKind {
    Pool,
    Billboard,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldType {
    U8,
    U16,
    U64,
    Pubkey,
}

impl FieldType {
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U64 => 8,
            Self::Pubkey => PUBKEY_LEN,
        }
    }
}

/// One fixed-width field. Header offsets are absolute, record offsets are
/// relative to the start of the record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub ty: FieldType,
}

impl Field {
    const fn new(name: &'static str, offset: usize, ty: FieldType) -> Self {
        Self { name, offset, ty }
    }

    pub const fn width(&self) -> usize {
        self.ty.width()
    }

    pub const fn end(&self) -> usize {
        self.offset + self.ty.width()
    }
}

/// A fixed header followed by `count` records of `record_width` bytes each.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    pub kind: StructureKind,
    pub variant: LayoutVariant,
    pub header: &'static [Field],
    pub count: Field,
    pub records_offset: usize,
    pub record: &'static [Field],
    pub record_width: usize,
    /// Records a blank account is sized for.
    pub capacity: usize,
}

impl Layout {
    pub fn header_field(&self, name: &str) -> Option<&Field> {
        self.header.iter().find(|f| f.name == name)
    }

    pub fn record_field(&self, name: &str) -> Option<&Field> {
        self.record.iter().find(|f| f.name == name)
    }

    /// First byte past `count` records, `None` on arithmetic overflow.
    pub fn records_end(&self, count: usize) -> Option<usize> {
        count
            .checked_mul(self.record_width)
            .and_then(|len| len.checked_add(self.records_offset))
    }

    /// Start of record `index`, `None` on arithmetic overflow.
    pub(crate) fn record_offset(&self, index: usize) -> Option<usize> {
        self.records_end(index)
    }

    /// Size of a blank account of this layout.
    pub const fn space(&self) -> usize {
        self.records_offset + self.capacity * self.record_width
    }
}

const GENESIS_POOL: Layout = Layout {
    kind: StructureKind::Pool,
    variant: LayoutVariant::Genesis,
    header: &[
        Field::new(FUND, 0, FieldType::U64),
        Field::new(OWNER, 8, FieldType::Pubkey),
    ],
    count: Field::new(PLAYER_COUNT, 40, FieldType::U16),
    records_offset: 42,
    record: &[Field::new(PLAYER, 0, FieldType::Pubkey)],
    record_width: 32,
    capacity: 10_000,
};

const PRICED_POOL: Layout = Layout {
    kind: StructureKind::Pool,
    variant: LayoutVariant::Priced,
    header: &[
        Field::new(AWARD, 0, FieldType::U64),
        Field::new(FUND, 8, FieldType::U64),
        Field::new(PRICE, 16, FieldType::U64),
    ],
    count: Field::new(PLAYER_COUNT, 24, FieldType::U16),
    records_offset: 26,
    record: &[
        Field::new(PLAYER, 0, FieldType::Pubkey),
        Field::new(TICKET, 32, FieldType::U16),
    ],
    record_width: 34,
    capacity: 1_000,
};

const CURRENT_POOL: Layout = Layout {
    kind: StructureKind::Pool,
    variant: LayoutVariant::Current,
    header: &[
        Field::new(AWARD, 0, FieldType::U64),
        Field::new(FUND, 8, FieldType::U64),
        Field::new(PRICE, 16, FieldType::U64),
        Field::new(FEE, 24, FieldType::Pubkey),
    ],
    count: Field::new(PLAYER_COUNT, 56, FieldType::U16),
    records_offset: 58,
    record: &[
        Field::new(PLAYER, 0, FieldType::Pubkey),
        Field::new(TICKET, 32, FieldType::U16),
        Field::new(RESERVED, 34, FieldType::U8),
    ],
    record_width: 35,
    capacity: 1_000,
};

const UNDATED_AWARD_RECORD: &[Field] = &[
    Field::new(ACCOUNT, 0, FieldType::Pubkey),
    Field::new(AWARD, 32, FieldType::U64),
    Field::new(REWARDED, 40, FieldType::U8),
];

const DATED_AWARD_RECORD: &[Field] = &[
    Field::new(ACCOUNT, 0, FieldType::Pubkey),
    Field::new(AWARD, 32, FieldType::U64),
    Field::new(REWARDED, 40, FieldType::U8),
    Field::new(TIMESTAMP, 41, FieldType::U64),
];

const GENESIS_BILLBOARD: Layout = Layout {
    kind: StructureKind::Billboard,
    variant: LayoutVariant::Genesis,
    header: &[],
    count: Field::new(AWARD_COUNT, 0, FieldType::U16),
    records_offset: 2,
    record: UNDATED_AWARD_RECORD,
    record_width: 41,
    capacity: 1_000,
};

const PRICED_BILLBOARD: Layout = Layout {
    kind: StructureKind::Billboard,
    variant: LayoutVariant::Priced,
    header: &[],
    count: Field::new(AWARD_COUNT, 0, FieldType::U16),
    records_offset: 2,
    record: DATED_AWARD_RECORD,
    record_width: 49,
    capacity: 1_000,
};

const CURRENT_BILLBOARD: Layout = Layout {
    variant: LayoutVariant::Current,
    ..PRICED_BILLBOARD
};

pub fn lookup(kind: StructureKind, variant: LayoutVariant) -> &'static Layout {
    match (kind, variant) {
        (StructureKind::Pool, LayoutVariant::Genesis) => &GENESIS_POOL,
        (StructureKind::Pool, LayoutVariant::Priced) => &PRICED_POOL,
        (StructureKind::Pool, LayoutVariant::Current) => &CURRENT_POOL,
        (StructureKind::Billboard, LayoutVariant::Genesis) => &GENESIS_BILLBOARD,
        (StructureKind::Billboard, LayoutVariant::Priced) => &PRICED_BILLBOARD,
        (StructureKind::Billboard, LayoutVariant::Current) => &CURRENT_BILLBOARD,
    }
}

pub fn pool_space(variant: LayoutVariant) -> usize {
    lookup(StructureKind::Pool, variant).space()
}

pub fn billboard_space(variant: LayoutVariant) -> usize {
    lookup(StructureKind::Billboard, variant).space()
}
