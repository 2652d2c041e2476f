//! Static registry of SQL type descriptors.
//!
//! Every abstract SQL type the library understands has exactly one
//! [`TypeDescriptor`] in [`REGISTRY`], built at compile time and never
//! mutated. Descriptors carry the precision/scale ranges a column of that
//! type may declare, whether it can be UNSIGNED, and the host
//! representations decoded values take.

use std::fmt;

use crate::core::column::ColumnFlags;
use crate::error::IntegrityViolation;

/// Abstract SQL column type.
///
/// Discriminants index [`REGISTRY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Clob,
    Boolean,
    NChar,
    NVarChar,
    LongNVarChar,
    NClob,
}

impl SqlType {
    /// The descriptor for this type.
    pub fn descriptor(self) -> &'static TypeDescriptor {
        &REGISTRY[self as usize]
    }

    /// Canonical (JDBC) type name, e.g. `VARCHAR`.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Resolve a type name or dialect alias, ignoring case.
    pub fn from_name(name: &str) -> Option<SqlType> {
        lookup(name).map(|d| d.sql_type)
    }

    /// Whether this is one of the integer types.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The Rust shape a decoded value of some SQL type takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    Bool,
    Bytes,
    I32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    Text,
    Date,
    Time,
    Timestamp,
}

/// Inclusive range with a default, used for precision and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Bounds {
    const NONE: Bounds = Bounds::new(0, 0, 0);

    const fn new(min: u32, max: u32, default: u32) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// When a type decodes into its second (alternate) representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateRule {
    /// Always the first representation.
    None,
    /// Precision above one selects the alternate (multi-bit BIT as bytes).
    MultiBit,
    /// Precision of exactly one selects the alternate (TINYINT(1) as bool).
    SingleDigit,
    /// UNSIGNED selects the alternate (wider integer).
    Unsigned,
}

/// Immutable description of one SQL type.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub sql_type: SqlType,
    pub name: &'static str,
    /// JDBC `java.sql.Types` code, as reported by driver metadata.
    pub type_code: i32,
    pub precision: Bounds,
    pub scale: Bounds,
    pub signable: bool,
    /// Precision is part of the DDL spelling (`VARCHAR(255)`).
    pub sized: bool,
    /// Scale is part of the DDL spelling (`DECIMAL(10,2)`).
    pub scaled: bool,
    /// First entry is the common case; a second one is picked by `alternate`.
    pub representations: &'static [HostType],
    pub alternate: AlternateRule,
    /// Other spellings of this type found in declared column types.
    pub aliases: &'static [&'static str],
}

impl TypeDescriptor {
    /// Check a column's precision, scale and flags against this type.
    ///
    /// Rules run in a fixed order and the first violation is returned:
    /// precision range, scale range, signedness, nullable primary key,
    /// autoincrement without primary key, autoincrement on a non-INTEGER
    /// type, signed autoincrement.
    pub fn verify_integrity(
        &self,
        precision: u32,
        scale: u32,
        flags: ColumnFlags,
    ) -> std::result::Result<(), IntegrityViolation> {
        if !self.precision.contains(precision) {
            return Err(IntegrityViolation::PrecisionOutOfRange {
                type_name: self.name,
                min: self.precision.min,
                max: self.precision.max,
                actual: precision,
            });
        }
        if !self.scale.contains(scale) {
            return Err(IntegrityViolation::ScaleOutOfRange {
                type_name: self.name,
                min: self.scale.min,
                max: self.scale.max,
                actual: scale,
            });
        }
        if flags.unsigned && !self.signable {
            return Err(IntegrityViolation::UnsignedNotSupported {
                type_name: self.name,
            });
        }
        if flags.primary && !flags.not_null {
            return Err(IntegrityViolation::NullablePrimaryKey);
        }
        if flags.autoincrement && !flags.primary {
            return Err(IntegrityViolation::AutoincrementWithoutPrimary);
        }
        if flags.autoincrement && self.sql_type != SqlType::Integer {
            return Err(IntegrityViolation::AutoincrementNotInteger {
                type_name: self.name,
            });
        }
        if flags.autoincrement && !flags.unsigned {
            return Err(IntegrityViolation::AutoincrementSigned);
        }
        Ok(())
    }

    /// Host representation for a column of this type.
    pub fn representation(&self, precision: u32, unsigned: bool) -> HostType {
        let use_alternate = match self.alternate {
            AlternateRule::None => false,
            AlternateRule::MultiBit => precision > 1,
            AlternateRule::SingleDigit => precision == 1,
            AlternateRule::Unsigned => unsigned,
        };
        match (use_alternate, self.representations) {
            (true, [_, alt, ..]) => *alt,
            (_, [first, ..]) => *first,
            (_, []) => HostType::Text,
        }
    }
}

/// Shorthand for the descriptor table below.
const fn desc(
    sql_type: SqlType,
    name: &'static str,
    type_code: i32,
    precision: Bounds,
    scale: Bounds,
    signable: bool,
    representations: &'static [HostType],
) -> TypeDescriptor {
    TypeDescriptor {
        sql_type,
        name,
        type_code,
        precision,
        scale,
        signable,
        sized: false,
        scaled: false,
        representations,
        alternate: AlternateRule::None,
        aliases: &[],
    }
}

const fn sized(mut d: TypeDescriptor) -> TypeDescriptor {
    d.sized = true;
    d
}

const fn scaled(mut d: TypeDescriptor) -> TypeDescriptor {
    d.sized = true;
    d.scaled = true;
    d
}

const fn alternate(mut d: TypeDescriptor, rule: AlternateRule) -> TypeDescriptor {
    d.alternate = rule;
    d
}

const fn aliases(mut d: TypeDescriptor, names: &'static [&'static str]) -> TypeDescriptor {
    d.aliases = names;
    d
}

use HostType as H;

/// Every supported type, in `SqlType` discriminant order.
pub static REGISTRY: [TypeDescriptor; 26] = [
    alternate(
        sized(desc(
            SqlType::Bit,
            "BIT",
            -7,
            Bounds::new(1, 64, 1),
            Bounds::NONE,
            false,
            &[H::Bool, H::Bytes],
        )),
        AlternateRule::MultiBit,
    ),
    alternate(
        desc(
            SqlType::TinyInt,
            "TINYINT",
            -6,
            Bounds::new(1, 3, 3),
            Bounds::NONE,
            true,
            &[H::I32, H::Bool],
        ),
        AlternateRule::SingleDigit,
    ),
    aliases(
        desc(SqlType::SmallInt, "SMALLINT", 5, Bounds::new(1, 5, 5), Bounds::NONE, true, &[H::I32]),
        &["INT2"],
    ),
    aliases(
        alternate(
            desc(
                SqlType::Integer,
                "INTEGER",
                4,
                Bounds::new(1, 10, 10),
                Bounds::NONE,
                true,
                &[H::I32, H::I64],
            ),
            AlternateRule::Unsigned,
        ),
        &["INT", "MEDIUMINT", "INT4"],
    ),
    aliases(
        alternate(
            desc(
                SqlType::BigInt,
                "BIGINT",
                -5,
                Bounds::new(1, 20, 19),
                Bounds::NONE,
                true,
                &[H::I64, H::U64],
            ),
            AlternateRule::Unsigned,
        ),
        &["INT8"],
    ),
    desc(
        SqlType::Float,
        "FLOAT",
        6,
        Bounds::new(1, 53, 12),
        Bounds::new(0, 30, 0),
        true,
        &[H::F32],
    ),
    desc(SqlType::Real, "REAL", 7, Bounds::new(1, 53, 24), Bounds::new(0, 30, 0), true, &[H::F32]),
    aliases(
        desc(
            SqlType::Double,
            "DOUBLE",
            8,
            Bounds::new(1, 53, 22),
            Bounds::new(0, 30, 0),
            true,
            &[H::F64],
        ),
        &["DOUBLE PRECISION"],
    ),
    scaled(desc(
        SqlType::Numeric,
        "NUMERIC",
        2,
        Bounds::new(1, 65, 10),
        Bounds::new(0, 30, 0),
        true,
        &[H::Decimal],
    )),
    aliases(
        scaled(desc(
            SqlType::Decimal,
            "DECIMAL",
            3,
            Bounds::new(1, 65, 10),
            Bounds::new(0, 30, 0),
            true,
            &[H::Decimal],
        )),
        &["DEC", "FIXED"],
    ),
    aliases(
        sized(desc(
            SqlType::Char,
            "CHAR",
            1,
            Bounds::new(0, 255, 1),
            Bounds::NONE,
            false,
            &[H::Text],
        )),
        &["CHARACTER"],
    ),
    sized(desc(
        SqlType::VarChar,
        "VARCHAR",
        12,
        Bounds::new(0, 65535, 255),
        Bounds::NONE,
        false,
        &[H::Text],
    )),
    aliases(
        desc(
            SqlType::LongVarChar,
            "LONGVARCHAR",
            -1,
            Bounds::NONE,
            Bounds::NONE,
            false,
            &[H::Text],
        ),
        &["LONGTEXT", "MEDIUMTEXT"],
    ),
    desc(SqlType::Date, "DATE", 91, Bounds::NONE, Bounds::NONE, false, &[H::Date]),
    sized(desc(SqlType::Time, "TIME", 92, Bounds::new(0, 6, 0), Bounds::NONE, false, &[H::Time])),
    aliases(
        sized(desc(
            SqlType::Timestamp,
            "TIMESTAMP",
            93,
            Bounds::new(0, 6, 0),
            Bounds::NONE,
            false,
            &[H::Timestamp],
        )),
        &["DATETIME"],
    ),
    sized(desc(
        SqlType::Binary,
        "BINARY",
        -2,
        Bounds::new(0, 255, 1),
        Bounds::NONE,
        false,
        &[H::Bytes],
    )),
    sized(desc(
        SqlType::VarBinary,
        "VARBINARY",
        -3,
        Bounds::new(0, 65535, 255),
        Bounds::NONE,
        false,
        &[H::Bytes],
    )),
    aliases(
        desc(
            SqlType::LongVarBinary,
            "LONGVARBINARY",
            -4,
            Bounds::NONE,
            Bounds::NONE,
            false,
            &[H::Bytes],
        ),
        &["LONGBLOB", "MEDIUMBLOB"],
    ),
    aliases(
        desc(SqlType::Blob, "BLOB", 2004, Bounds::NONE, Bounds::NONE, false, &[H::Bytes]),
        &["TINYBLOB"],
    ),
    aliases(
        desc(SqlType::Clob, "CLOB", 2005, Bounds::NONE, Bounds::NONE, false, &[H::Text]),
        &["TEXT", "TINYTEXT"],
    ),
    aliases(
        desc(SqlType::Boolean, "BOOLEAN", 16, Bounds::NONE, Bounds::NONE, false, &[H::Bool]),
        &["BOOL"],
    ),
    sized(desc(
        SqlType::NChar,
        "NCHAR",
        -15,
        Bounds::new(0, 255, 1),
        Bounds::NONE,
        false,
        &[H::Text],
    )),
    sized(desc(
        SqlType::NVarChar,
        "NVARCHAR",
        -9,
        Bounds::new(0, 65535, 255),
        Bounds::NONE,
        false,
        &[H::Text],
    )),
    desc(SqlType::LongNVarChar, "LONGNVARCHAR", -16, Bounds::NONE, Bounds::NONE, false, &[H::Text]),
    desc(SqlType::NClob, "NCLOB", 2011, Bounds::NONE, Bounds::NONE, false, &[H::Text]),
];

/// All registered descriptors.
pub fn descriptors() -> &'static [TypeDescriptor] {
    &REGISTRY
}

/// Find a descriptor by type name or alias, ignoring case.
pub fn lookup(name: &str) -> Option<&'static TypeDescriptor> {
    let name = name.trim();
    REGISTRY.iter().find(|d| {
        d.name.eq_ignore_ascii_case(name) || d.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}

/// Find a descriptor by its JDBC type code.
pub fn by_type_code(code: i32) -> Option<&'static TypeDescriptor> {
    REGISTRY.iter().find(|d| d.type_code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> ColumnFlags {
        ColumnFlags::default()
    }

    #[test]
    fn test_registry_order_matches_discriminants() {
        for (i, d) in REGISTRY.iter().enumerate() {
            assert_eq!(d.sql_type as usize, i, "{} is out of place", d.name);
            assert_eq!(d.sql_type.descriptor().name, d.name);
        }
    }

    #[test]
    fn test_names_and_codes_are_unique() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in &REGISTRY[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.type_code, b.type_code, "{} / {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_defaults_are_accepted() {
        for d in descriptors() {
            assert_eq!(
                d.verify_integrity(d.precision.default, d.scale.default, flags()),
                Ok(()),
                "{} rejected its own defaults",
                d.name
            );
        }
    }

    #[test]
    fn test_precision_one_past_bounds_is_rejected() {
        for d in descriptors() {
            let over = d.verify_integrity(d.precision.max + 1, d.scale.default, flags());
            assert!(
                matches!(over, Err(IntegrityViolation::PrecisionOutOfRange { .. })),
                "{} accepted precision {}",
                d.name,
                d.precision.max + 1
            );
            if d.precision.min > 0 {
                let under = d.verify_integrity(d.precision.min - 1, d.scale.default, flags());
                assert!(matches!(under, Err(IntegrityViolation::PrecisionOutOfRange { .. })));
            }
        }
    }

    #[test]
    fn test_scale_one_past_bounds_is_rejected() {
        for d in descriptors() {
            let over = d.verify_integrity(d.precision.default, d.scale.max + 1, flags());
            assert!(
                matches!(over, Err(IntegrityViolation::ScaleOutOfRange { .. })),
                "{} accepted scale {}",
                d.name,
                d.scale.max + 1
            );
        }
    }

    #[test]
    fn test_precision_checked_before_scale() {
        let d = SqlType::Decimal.descriptor();
        assert!(matches!(
            d.verify_integrity(66, 31, flags()),
            Err(IntegrityViolation::PrecisionOutOfRange { actual: 66, .. })
        ));
    }

    #[test]
    fn test_unsigned_on_unsignable_type() {
        let f = ColumnFlags {
            unsigned: true,
            ..flags()
        };
        assert_eq!(
            SqlType::VarChar.descriptor().verify_integrity(255, 0, f),
            Err(IntegrityViolation::UnsignedNotSupported { type_name: "VARCHAR" })
        );
        assert_eq!(SqlType::BigInt.descriptor().verify_integrity(19, 0, f), Ok(()));
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_knows_aliases() {
        assert_eq!(lookup("varchar").map(|d| d.sql_type), Some(SqlType::VarChar));
        assert_eq!(lookup("INT").map(|d| d.sql_type), Some(SqlType::Integer));
        assert_eq!(lookup("datetime").map(|d| d.sql_type), Some(SqlType::Timestamp));
        assert_eq!(lookup("LongText").map(|d| d.sql_type), Some(SqlType::LongVarChar));
        assert_eq!(lookup("bool").map(|d| d.sql_type), Some(SqlType::Boolean));
        assert!(lookup("GEOMETRY").is_none());
    }

    #[test]
    fn test_by_type_code() {
        assert_eq!(by_type_code(4).map(|d| d.sql_type), Some(SqlType::Integer));
        assert_eq!(by_type_code(12).map(|d| d.sql_type), Some(SqlType::VarChar));
        assert_eq!(by_type_code(2011).map(|d| d.sql_type), Some(SqlType::NClob));
        assert!(by_type_code(1111).is_none());
    }

    #[test]
    fn test_alternate_representations() {
        assert_eq!(SqlType::Bit.descriptor().representation(1, false), HostType::Bool);
        assert_eq!(SqlType::Bit.descriptor().representation(8, false), HostType::Bytes);
        assert_eq!(SqlType::TinyInt.descriptor().representation(1, false), HostType::Bool);
        assert_eq!(SqlType::TinyInt.descriptor().representation(3, false), HostType::I32);
        assert_eq!(SqlType::Integer.descriptor().representation(10, false), HostType::I32);
        assert_eq!(SqlType::Integer.descriptor().representation(10, true), HostType::I64);
        assert_eq!(SqlType::BigInt.descriptor().representation(19, true), HostType::U64);
        assert_eq!(SqlType::VarChar.descriptor().representation(255, true), HostType::Text);
    }

    #[test]
    fn test_display_uses_canonical_name() {
        assert_eq!(SqlType::LongNVarChar.to_string(), "LONGNVARCHAR");
        assert_eq!(SqlType::from_name("Fixed"), Some(SqlType::Decimal));
    }
}
