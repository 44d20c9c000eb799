use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;

/// Turns `fn name(mock_provider: &MockProvider) { ... }` into a test that starts a mock provider,
/// runs the body against it, verifies the interactions and writes the contract file.
///
/// `#[consumer_contract_test("consumerName", "providerName", configure)]` where `configure` is a
/// `fn(&mut MockServerConfig)`. The contract file is written and the server stopped even when
/// the body panics; the panic is resumed afterwards.
#[proc_macro_attribute]
pub fn consumer_contract_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    if args.len() < 3 {
        return quote! {
            compile_error!("A consumer name, a provider name and a configuration function should be passed to the macro");
        }
        .into();
    }

    let consumer = match parse_participant_name(&args[0], "first") {
        Ok(name) => name,
        Err(stream) => return stream.into(),
    };
    let provider = match parse_participant_name(&args[1], "second") {
        Ok(name) => name,
        Err(stream) => return stream.into(),
    };

    let configuration_function;
    if let syn::NestedMeta::Meta(syn::Meta::Path(function_path)) = &args[2] {
        configuration_function = function_path;
    } else {
        let error = quote! {
            compile_error!("The third argument should be a configuration function!");
        };

        return error.into();
    }

    if input.sig.inputs.len() != 1 {
        return quote_spanned! {input.sig.ident.span()=>
            compile_error!("The test function should take the mock provider as its only argument!");
        }
        .into();
    }

    if !matches!(input.sig.output, syn::ReturnType::Default) {
        return quote_spanned! {input.sig.ident.span()=>
            compile_error!("The test function shouldn't return a value!");
        }
        .into();
    }

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let test_name = &input.sig.ident;

    let mut body_function = input.clone();
    body_function.attrs.clear();
    body_function.vis = syn::Visibility::Inherited;
    body_function.sig.ident = syn::Ident::new("__consumer_contract_body", Span::call_site());

    let output = quote! {
        #(#attributes)*
        #[test]
        #visibility fn #test_name() {
            #body_function

            let mut __contract_configuration = contract_kit::MockServerConfig::new(#consumer, #provider);
            #configuration_function(&mut __contract_configuration);

            let __mock_provider = match contract_kit::MockProvider::setup(__contract_configuration) {
                Ok(mock_provider) => mock_provider,
                Err(e) => panic!("Contract Error: {}", e),
            };

            let __outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                __consumer_contract_body(&__mock_provider)
            }));
            let __verification = __mock_provider.verify();
            let __written = __mock_provider.finalize();

            if let Err(e) = __outcome {
                std::panic::resume_unwind(e);
            }
            if let Err(e) = __verification {
                panic!("Contract Error: {}", e);
            }
            if let Err(e) = __written {
                panic!("Contract Error: {}", e);
            }
        }
    };

    TokenStream::from(output)
}

fn parse_participant_name(
    arg: &syn::NestedMeta,
    position: &str,
) -> Result<String, proc_macro2::TokenStream> {
    if let syn::NestedMeta::Lit(syn::Lit::Str(name)) = arg {
        validate_participant_name(&name.value(), name.span())?;
        Ok(name.value())
    } else {
        let message = format!("The {} argument should be a string literal!", position);
        Err(quote! {
            compile_error!(#message);
        })
    }
}

fn validate_participant_name(name: &str, span: Span) -> Result<(), proc_macro2::TokenStream> {
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') {
        return Err(quote_spanned! {span=>
            compile_error!("The name should be non-empty and usable in a file name!");
        });
    }

    Ok(())
}
