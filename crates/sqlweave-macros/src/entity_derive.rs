//! Implementation of the Entity derive macro.
//!
//! Reads `#[entity(...)]` on the struct and `#[column(...)]` on its fields and
//! generates an `Entity` impl backed by a lazily built static `ObjectInfo`.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use regex::Regex;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitBool, LitStr, Result, Type};

/// Parsed definition of a struct with `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityDef {
    /// The struct name.
    pub name: Ident,
    /// Table name; defaults to the struct name.
    pub table: String,
    /// Optional schema.
    pub schema: Option<String>,
    /// Mapped fields in declaration order.
    pub columns: Vec<ColumnDef>,
}

/// Parsed mapping of a single field.
#[derive(Debug)]
pub struct ColumnDef {
    /// The field name.
    pub field: Ident,
    /// The field type.
    pub ty: Type,
    /// Column name; defaults to the field name.
    pub column: String,
    /// Whether this is the identifier.
    pub identifier: bool,
    /// `assigned`, `db_generated` or `sequence`.
    pub strategy: Strategy,
    /// Sequence name for sequence identifiers.
    pub sequence: Option<String>,
    /// Explicit provider type, e.g. `AnsiString`.
    pub db_type: Option<Ident>,
    /// Whether INSERT writes this column.
    pub insert: bool,
    /// Whether UPDATE writes this column.
    pub update: bool,
}

/// Identifier strategy as written in the attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Assigned,
    DbGenerated,
    Sequence,
}

impl Strategy {
    fn parse(lit: &LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "assigned" => Ok(Strategy::Assigned),
            "db_generated" => Ok(Strategy::DbGenerated),
            "sequence" => Ok(Strategy::Sequence),
            other => Err(Error::new_spanned(
                lit,
                format!(
                    "unknown identifier strategy `{other}`. \
                     Valid strategies are: assigned, db_generated, sequence"
                ),
            )),
        }
    }

    fn tokens(self) -> TokenStream {
        match self {
            Strategy::Assigned => quote!(::sqlweave_core::IdentifierStrategy::Assigned),
            Strategy::DbGenerated => quote!(::sqlweave_core::IdentifierStrategy::DbGenerated),
            Strategy::Sequence => quote!(::sqlweave_core::IdentifierStrategy::Sequence),
        }
    }
}

const DB_TYPES: &[&str] = &[
    "Boolean",
    "SByte",
    "Int16",
    "Int32",
    "Int64",
    "Single",
    "Double",
    "Decimal",
    "String",
    "AnsiString",
    "Binary",
    "Date",
    "Time",
    "DateTime",
    "DateTimeOffset",
    "Guid",
    "Json",
    "Object",
];

/// Sequence names are inlined into SQL, so they must be plain identifiers.
fn check_sequence_name(lit: &LitStr) -> Result<String> {
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*(\.[A-Za-z_][A-Za-z0-9_$#]*)*$")
        .map_err(|e| Error::new_spanned(lit, format!("internal pattern error: {e}")))?;
    let name = lit.value();
    if pattern.is_match(&name) {
        Ok(name)
    } else {
        Err(Error::new_spanned(
            lit,
            format!("`{name}` is not a valid sequence name"),
        ))
    }
}

/// Parse a `DeriveInput` into an `EntityDef`.
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    let mut table = input.ident.to_string();
    let mut schema = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = meta.value()?.parse::<LitStr>()?.value();
            } else if meta.path.is_ident("schema") {
                schema = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                return Err(meta.error(format!(
                    "unknown entity attribute `{attr_name}`. Valid attributes are: table, schema"
                )));
            }
            Ok(())
        })?;
    }

    let mut columns = match fields {
        Fields::Named(named) => {
            let mut columns = Vec::new();
            for field in &named.named {
                if let Some(column) = parse_column(field)? {
                    columns.push(column);
                }
            }
            columns
        }
        Fields::Unnamed(_) => {
            return Err(Error::new_spanned(
                fields,
                "Entity requires a struct with named fields",
            ));
        }
        Fields::Unit => Vec::new(),
    };

    let marked: Vec<&ColumnDef> = columns.iter().filter(|c| c.identifier).collect();
    if marked.len() > 1 {
        return Err(Error::new_spanned(
            &marked[1].field,
            "only one field can be marked as the identifier",
        ));
    }
    // An unmarked field called `id` is the identifier by convention.
    if marked.is_empty() {
        if let Some(id) = columns.iter_mut().find(|c| c.field == "id") {
            id.identifier = true;
        }
    }

    for column in &columns {
        if column.identifier && column.strategy == Strategy::Sequence && column.sequence.is_none() {
            return Err(Error::new_spanned(
                &column.field,
                "a sequence identifier needs `sequence = \"name\"`",
            ));
        }
    }

    Ok(EntityDef {
        name: input.ident.clone(),
        table,
        schema,
        columns,
    })
}

/// Parse one field. Returns `None` for `#[column(ignore)]`.
fn parse_column(field: &Field) -> Result<Option<ColumnDef>> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut column = ColumnDef {
        column: name.to_string(),
        field: name,
        ty: field.ty.clone(),
        identifier: false,
        strategy: Strategy::DbGenerated,
        sequence: None,
        db_type: None,
        insert: true,
        update: true,
    };
    let mut ignore = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("name") {
                column.column = meta.value()?.parse::<LitStr>()?.value();
            } else if path.is_ident("identifier") {
                column.identifier = true;
            } else if path.is_ident("strategy") {
                column.strategy = Strategy::parse(&meta.value()?.parse::<LitStr>()?)?;
            } else if path.is_ident("sequence") {
                column.sequence = Some(check_sequence_name(&meta.value()?.parse::<LitStr>()?)?);
                column.strategy = Strategy::Sequence;
            } else if path.is_ident("db_type") {
                let lit = meta.value()?.parse::<LitStr>()?;
                if !DB_TYPES.contains(&lit.value().as_str()) {
                    return Err(Error::new_spanned(
                        &lit,
                        format!("unknown db_type `{}`", lit.value()),
                    ));
                }
                column.db_type = Some(Ident::new(&lit.value(), lit.span()));
            } else if path.is_ident("insert") {
                column.insert = meta.value()?.parse::<LitBool>()?.value;
            } else if path.is_ident("update") {
                column.update = meta.value()?.parse::<LitBool>()?.value;
            } else if path.is_ident("ignore") {
                ignore = true;
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(meta.error(format!(
                    "unknown column attribute `{attr_name}`. \
                     Valid attributes are: name, identifier, strategy, sequence, db_type, \
                     insert, update, ignore"
                )));
            }
            Ok(())
        })?;
    }

    Ok(if ignore { None } else { Some(column) })
}

/// Generate the `Entity` implementation.
pub fn generate_entity_impl(def: &EntityDef) -> TokenStream {
    let name = &def.name;
    let type_name = name.to_string();
    let table = &def.table;

    let schema = def.schema.as_ref().map(|s| quote!(.schema(#s)));

    let column_infos = def.columns.iter().map(|c| {
        let field = c.field.to_string();
        let column = &c.column;
        let ty = &c.ty;
        let db_type = match &c.db_type {
            Some(ident) => quote!(::sqlweave_core::DbType::#ident),
            None => quote!(<#ty as ::sqlweave_core::FromValue>::DB_TYPE),
        };
        let mut info = quote! {
            ::sqlweave_core::ColumnInfo::new(#field, #column, #db_type)
        };
        if c.identifier {
            let strategy = c.strategy.tokens();
            info = quote!(#info.identifier(#strategy));
            if let Some(sequence) = &c.sequence {
                info = quote!(#info.sequence(#sequence));
            }
        } else {
            if !c.insert {
                info = quote!(#info.allow_insert(false));
            }
            if !c.update {
                info = quote!(#info.allow_update(false));
            }
        }
        quote!(.column(#info))
    });

    let getters = def.columns.iter().enumerate().map(|(i, c)| {
        let field = &c.field;
        quote!(#i => ::sqlweave_core::ToValue::to_value(&self.#field),)
    });

    let setters = def.columns.iter().enumerate().map(|(i, c)| {
        let field = &c.field;
        let ty = &c.ty;
        quote! {
            #i => {
                self.#field = <#ty as ::sqlweave_core::FromValue>::from_value(value)?;
            }
        }
    });

    quote! {
        impl ::sqlweave_core::Entity for #name {
            fn object_info() -> &'static ::sqlweave_core::ObjectInfo {
                static INFO: ::std::sync::OnceLock<::sqlweave_core::ObjectInfo> =
                    ::std::sync::OnceLock::new();
                INFO.get_or_init(|| {
                    ::sqlweave_core::ObjectInfo::builder(#type_name, #table)
                        #schema
                        #(#column_infos)*
                        .build()
                })
            }

            fn create_instance() -> Self {
                <Self as ::core::default::Default>::default()
            }

            fn get_value(&self, index: usize) -> ::sqlweave_core::Value {
                match index {
                    #(#getters)*
                    _ => ::sqlweave_core::Value::Null,
                }
            }

            #[allow(clippy::match_single_binding)]
            fn set_value(
                &mut self,
                index: usize,
                value: ::sqlweave_core::Value,
            ) -> ::sqlweave_core::Result<()> {
                match index {
                    #(#setters)*
                    _ => {
                        let _ = value;
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    }
}
